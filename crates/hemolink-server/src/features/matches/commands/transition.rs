use hemolink_common::types::{AvailabilityStatus, MatchStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;
use crate::features::shared::validation::{validate_notes, NotesValidationError};

// ============================================================================
// Command
// ============================================================================

/// Moves a match to a new lifecycle status.
///
/// Completion is deliberately excluded: it writes the donation ledger and
/// goes through [`super::complete::CompleteMatch`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionMatch {
    pub match_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub next_status: MatchStatus,
    pub notes: Option<String>,
}

impl Command for TransitionMatch {}

impl mediator::Request<Result<TransitionMatchResponse, TransitionMatchError>> for TransitionMatch {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionMatchResponse {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub request_id: Uuid,
    pub status: MatchStatus,
    /// Other open matches of the same donor cancelled by a confirmation.
    pub cancelled_sibling_matches: u64,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitionMatchError {
    #[error("completed is set by the completion operation, not by transition")]
    CompletionViaTransition,

    #[error("invalid notes: {0}")]
    InvalidNotes(#[from] NotesValidationError),

    #[error("match {0} not found")]
    NotFound(Uuid),

    #[error("caller may not apply this transition")]
    NotAuthorized,

    #[error("cannot transition match from {from} to {to}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    id: Uuid,
    donor_id: Uuid,
    request_id: Uuid,
    status: MatchStatus,
    hospital_id: Uuid,
}

/// Who may request which transition. Admins act freely; donors confirm or
/// cancel their own matches; hospitals mark their own requests' matches as
/// contacted.
fn authorize(
    caller_id: Uuid,
    caller_role: Role,
    row: &MatchRow,
    next: MatchStatus,
) -> Result<(), TransitionMatchError> {
    let allowed = match caller_role {
        Role::Admin => true,
        Role::Donor => {
            caller_id == row.donor_id
                && matches!(next, MatchStatus::Confirmed | MatchStatus::Cancelled)
        }
        Role::Hospital => caller_id == row.hospital_id && next == MatchStatus::Contacted,
    };
    if allowed {
        Ok(())
    } else {
        Err(TransitionMatchError::NotAuthorized)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: TransitionMatch,
) -> Result<TransitionMatchResponse, TransitionMatchError> {
    if command.next_status == MatchStatus::Completed {
        return Err(TransitionMatchError::CompletionViaTransition);
    }
    if let Some(notes) = &command.notes {
        validate_notes(notes)?;
    }

    let row = sqlx::query_as::<_, MatchRow>(
        r#"
        SELECT m.id, m.donor_id, m.request_id, m.status, r.hospital_id
        FROM donor_matches m
        JOIN blood_requests r ON r.id = m.request_id
        WHERE m.id = ?1
        "#,
    )
    .bind(command.match_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(TransitionMatchError::NotFound(command.match_id))?;

    authorize(command.caller_id, command.caller_role, &row, command.next_status)?;

    if !row.status.can_transition_to(command.next_status) {
        return Err(TransitionMatchError::InvalidTransition {
            from: row.status,
            to: command.next_status,
        });
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE donor_matches SET status = ?2, notes = COALESCE(?3, notes) WHERE id = ?1",
    )
    .bind(row.id)
    .bind(command.next_status)
    .bind(&command.notes)
    .execute(&mut *tx)
    .await?;

    // Confirmation commits the donor: take them off the available pool,
    // withdraw their other open matches, and advance the request.
    let mut cancelled_siblings = 0u64;
    if command.next_status == MatchStatus::Confirmed {
        sqlx::query("UPDATE donors SET availability_status = ?2 WHERE id = ?1")
            .bind(row.donor_id)
            .bind(AvailabilityStatus::Unavailable)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            UPDATE donor_matches
            SET status = 'cancelled'
            WHERE donor_id = ?1
              AND id != ?2
              AND status IN ('pending', 'contacted')
            "#,
        )
        .bind(row.donor_id)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;
        cancelled_siblings = result.rows_affected();

        sqlx::query("UPDATE blood_requests SET status = 'matched' WHERE id = ?1 AND status = 'pending'")
            .bind(row.request_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        match_id = %row.id,
        from = %row.status,
        to = %command.next_status,
        "match transitioned"
    );

    Ok(TransitionMatchResponse {
        id: row.id,
        donor_id: row.donor_id,
        request_id: row.request_id,
        status: command.next_status,
        cancelled_sibling_matches: cancelled_siblings,
    })
}

// ============================================================================
// Tests
// ============================================================================
