//! Error types shared across HemoLink crates.

use thiserror::Error;

/// Core error type for HemoLink operations.
#[derive(Error, Debug)]
pub enum HemolinkError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value could not be parsed into a domain type
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Catch-all for unexpected errors
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Convenience result type using [`HemolinkError`].
pub type Result<T> = std::result::Result<T, HemolinkError>;

impl HemolinkError {
    /// Create a parse error with a description of the rejected value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
