pub mod animation;
pub mod physics;
pub mod scene;
