pub mod event;
pub mod progression;
pub mod stage;
pub mod state;
