pub mod contact;
pub mod get;
pub mod list;
