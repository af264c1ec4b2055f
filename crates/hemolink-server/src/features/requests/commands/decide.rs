use hemolink_common::types::{RequestStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;

// ============================================================================
// Command
// ============================================================================

/// An admin ruling on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Approve,
    Reject,
}

/// Applies an admin decision to a pending request: approval advances it to
/// matched, rejection cancels it along with its open match proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideBloodRequest {
    pub request_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub decision: RequestDecision,
}

impl Command for DecideBloodRequest {}

impl mediator::Request<Result<DecideBloodRequestResponse, DecideBloodRequestError>>
    for DecideBloodRequest
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideBloodRequestResponse {
    pub id: Uuid,
    pub status: RequestStatus,
    pub cancelled_matches: u64,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DecideBloodRequestError {
    #[error("request {0} not found")]
    NotFound(Uuid),

    #[error("only admins decide on requests")]
    NotAuthorized,

    #[error("request is {status}, only a pending request can be decided")]
    NotPending { status: RequestStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: DecideBloodRequest,
) -> Result<DecideBloodRequestResponse, DecideBloodRequestError> {
    if command.caller_role != Role::Admin {
        return Err(DecideBloodRequestError::NotAuthorized);
    }

    let status: RequestStatus =
        sqlx::query_scalar("SELECT status FROM blood_requests WHERE id = ?1")
            .bind(command.request_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(DecideBloodRequestError::NotFound(command.request_id))?;

    if status != RequestStatus::Pending {
        return Err(DecideBloodRequestError::NotPending { status });
    }

    let next = match command.decision {
        RequestDecision::Approve => RequestStatus::Matched,
        RequestDecision::Reject => RequestStatus::Cancelled,
    };

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE blood_requests SET status = ?2 WHERE id = ?1")
        .bind(command.request_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

    let mut cancelled_matches = 0u64;
    if command.decision == RequestDecision::Reject {
        let result = sqlx::query(
            r#"
            UPDATE donor_matches
            SET status = 'cancelled'
            WHERE request_id = ?1 AND status IN ('pending', 'contacted')
            "#,
        )
        .bind(command.request_id)
        .execute(&mut *tx)
        .await?;
        cancelled_matches = result.rows_affected();
    }

    tx.commit().await?;

    tracing::info!(
        request_id = %command.request_id,
        decision = ?command.decision,
        "request decided"
    );

    Ok(DecideBloodRequestResponse {
        id: command.request_id,
        status: next,
        cancelled_matches,
    })
}

// ============================================================================
// Tests
// ============================================================================
