pub mod catalog;
pub mod entity;
pub mod layout;
