pub mod complete;
pub mod transition;
