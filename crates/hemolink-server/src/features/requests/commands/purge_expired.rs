use chrono::{DateTime, Duration, Utc};
use hemolink_common::types::Role;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;

// ============================================================================
// Command
// ============================================================================

/// Deletes fulfilled requests older than the retention window.
///
/// Match rows go with them through the cascade; the donation ledger keeps
/// its entries because history outlives the request that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeExpiredRequests {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub older_than_days: i64,
}

impl Command for PurgeExpiredRequests {}

impl mediator::Request<Result<PurgeExpiredRequestsResponse, PurgeExpiredRequestsError>>
    for PurgeExpiredRequests
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeExpiredRequestsResponse {
    pub deleted_requests: u64,
    pub cutoff: DateTime<Utc>,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PurgeExpiredRequestsError {
    #[error("only admins purge expired requests")]
    NotAuthorized,

    #[error("retention window must be at least one day, got {0}")]
    InvalidRetention(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: PurgeExpiredRequests,
) -> Result<PurgeExpiredRequestsResponse, PurgeExpiredRequestsError> {
    if command.caller_role != Role::Admin {
        return Err(PurgeExpiredRequestsError::NotAuthorized);
    }
    if command.older_than_days < 1 {
        return Err(PurgeExpiredRequestsError::InvalidRetention(
            command.older_than_days,
        ));
    }

    let cutoff = Utc::now() - Duration::days(command.older_than_days);

    let result =
        sqlx::query("DELETE FROM blood_requests WHERE status = 'fulfilled' AND created_at < ?1")
            .bind(cutoff)
            .execute(&pool)
            .await?;

    tracing::info!(
        deleted = result.rows_affected(),
        cutoff = %cutoff,
        "expired fulfilled requests purged"
    );

    Ok(PurgeExpiredRequestsResponse {
        deleted_requests: result.rows_affected(),
        cutoff,
    })
}

// ============================================================================
// Tests
// ============================================================================
