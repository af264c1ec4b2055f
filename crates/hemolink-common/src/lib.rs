//! Common types and utilities shared across HemoLink crates.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

pub use error::{HemolinkError, Result};
