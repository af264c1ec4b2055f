use hemolink_common::types::{MatchStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::get::MatchDetails;
use crate::cqrs::middleware::Query;
use crate::features::shared::pagination::{PaginationError, PaginationMetadata, PaginationParams};

// ============================================================================
// Query
// ============================================================================

/// Lists matches visible to the caller, newest first.
///
/// Donors see their own matches, hospitals the matches on their requests,
/// admins everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMatches {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub status: Option<MatchStatus>,
    pub pagination: PaginationParams,
}

impl Query for ListMatches {}

impl mediator::Request<Result<ListMatchesResponse, ListMatchesError>> for ListMatches {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMatchesResponse {
    pub matches: Vec<MatchDetails>,
    pub pagination: PaginationMetadata,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ListMatchesError {
    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    query: ListMatches,
) -> Result<ListMatchesResponse, ListMatchesError> {
    query.pagination.validate()?;

    let (donor_filter, hospital_filter) = match query.caller_role {
        Role::Admin => (None, None),
        Role::Donor => (Some(query.caller_id), None),
        Role::Hospital => (None, Some(query.caller_id)),
    };

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM donor_matches m
        JOIN blood_requests r ON r.id = m.request_id
        WHERE (?1 IS NULL OR m.donor_id = ?1)
          AND (?2 IS NULL OR r.hospital_id = ?2)
          AND (?3 IS NULL OR m.status = ?3)
        "#,
    )
    .bind(donor_filter)
    .bind(hospital_filter)
    .bind(query.status)
    .fetch_one(&pool)
    .await?;

    let matches = sqlx::query_as::<_, MatchDetails>(
        r#"
        SELECT m.id, m.donor_id, d.full_name AS donor_name, d.blood_group,
               m.request_id, r.hospital_id, h.name AS hospital_name,
               r.quantity_units, r.urgency, m.status, m.notes, m.created_at
        FROM donor_matches m
        JOIN donors d ON d.id = m.donor_id
        JOIN blood_requests r ON r.id = m.request_id
        JOIN hospitals h ON h.id = r.hospital_id
        WHERE (?1 IS NULL OR m.donor_id = ?1)
          AND (?2 IS NULL OR r.hospital_id = ?2)
          AND (?3 IS NULL OR m.status = ?3)
        ORDER BY m.created_at DESC
        LIMIT ?4 OFFSET ?5
        "#,
    )
    .bind(donor_filter)
    .bind(hospital_filter)
    .bind(query.status)
    .bind(query.pagination.per_page())
    .bind(query.pagination.offset())
    .fetch_all(&pool)
    .await?;

    let pagination =
        PaginationMetadata::new(query.pagination.page(), query.pagination.per_page(), total);

    Ok(ListMatchesResponse { matches, pagination })
}

// ============================================================================
// Tests
// ============================================================================
