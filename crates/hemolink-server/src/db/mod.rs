//! Database pool construction and migrations.

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Embedded migrations from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database configuration error: {0}")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Create a connection pool for the configured SQLite database.
///
/// The database file is created on first use; foreign key enforcement is
/// always on.
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<SqlitePool> {
    if config.url.is_empty() {
        return Err(DbError::Config("database url is empty".to_string()));
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(config.idle_timeout_secs.map(Duration::from_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Apply pending migrations.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Cheap liveness probe used by the health endpoint.
pub async fn health_check(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
