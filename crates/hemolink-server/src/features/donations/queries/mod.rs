pub mod list;
pub mod stats;
