//! Classification of database constraint failures.
//!
//! Command handlers use these to turn constraint violations into domain
//! errors (duplicate email, unknown hospital) instead of opaque 500s.

/// True when the error is a UNIQUE constraint violation.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// True when the error is a FOREIGN KEY constraint violation.
pub fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
