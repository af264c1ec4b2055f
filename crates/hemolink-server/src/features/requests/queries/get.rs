use chrono::{DateTime, Utc};
use hemolink_common::types::{BloodGroup, RequestStatus, Role, UrgencyLevel};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Query;

// ============================================================================
// Query
// ============================================================================

/// Fetches one request. Visible to admins, the owning hospital, and donors
/// holding a live match on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBloodRequest {
    pub request_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

impl Query for GetBloodRequest {}

impl mediator::Request<Result<BloodRequestDetails, GetBloodRequestError>> for GetBloodRequest {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BloodRequestDetails {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub hospital_name: String,
    pub hospital_city: String,
    pub blood_group: BloodGroup,
    pub quantity_units: i64,
    pub urgency: UrgencyLevel,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GetBloodRequestError {
    #[error("request {0} not found")]
    NotFound(Uuid),

    #[error("caller has no business with this request")]
    NotAuthorized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    query: GetBloodRequest,
) -> Result<BloodRequestDetails, GetBloodRequestError> {
    let details = sqlx::query_as::<_, BloodRequestDetails>(
        r#"
        SELECT r.id, r.hospital_id, h.name AS hospital_name, h.city AS hospital_city,
               r.blood_group, r.quantity_units, r.urgency, r.status, r.notes, r.created_at
        FROM blood_requests r
        JOIN hospitals h ON h.id = r.hospital_id
        WHERE r.id = ?1
        "#,
    )
    .bind(query.request_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetBloodRequestError::NotFound(query.request_id))?;

    let allowed = match query.caller_role {
        Role::Admin => true,
        Role::Hospital => query.caller_id == details.hospital_id,
        Role::Donor => {
            sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM donor_matches
                    WHERE request_id = ?1 AND donor_id = ?2 AND status != 'cancelled'
                )
                "#,
            )
            .bind(details.id)
            .bind(query.caller_id)
            .fetch_one(&pool)
            .await?
        }
    };
    if !allowed {
        return Err(GetBloodRequestError::NotAuthorized);
    }

    Ok(details)
}

// ============================================================================
// Tests
// ============================================================================
