use chrono::{DateTime, NaiveDate, Utc};
use hemolink_common::types::Role;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Query;
use crate::features::shared::pagination::{PaginationError, PaginationMetadata, PaginationParams};

// ============================================================================
// Query
// ============================================================================

/// Lists ledger entries visible to the caller, most recent donation first.
///
/// Donors see their own history, hospitals the donations received at their
/// site. Admins see everything and may narrow by donor or hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDonations {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub donor_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
    pub pagination: PaginationParams,
}

impl Query for ListDonations {}

impl mediator::Request<Result<ListDonationsResponse, ListDonationsError>> for ListDonations {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DonationRecordView {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: String,
    pub hospital_id: Uuid,
    pub hospital_name: String,
    pub request_id: Uuid,
    pub donation_date: NaiveDate,
    pub quantity_units: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDonationsResponse {
    pub donations: Vec<DonationRecordView>,
    pub pagination: PaginationMetadata,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ListDonationsError {
    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),

    #[error("only admins may filter someone else's history")]
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
    query: ListDonations,
) -> Result<ListDonationsResponse, ListDonationsError> {
    query.pagination.validate()?;

    // Non-admins get their own scope regardless of requested filters.
    let (donor_filter, hospital_filter) = match query.caller_role {
        Role::Admin => (query.donor_id, query.hospital_id),
        Role::Donor => {
            if query.donor_id.is_some_and(|id| id != query.caller_id)
                || query.hospital_id.is_some()
            {
                return Err(ListDonationsError::NotAuthorized);
            }
            (Some(query.caller_id), None)
        }
        Role::Hospital => {
            if query.hospital_id.is_some_and(|id| id != query.caller_id)
                || query.donor_id.is_some()
            {
                return Err(ListDonationsError::NotAuthorized);
            }
            (None, Some(query.caller_id))
        }
    };

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM donation_records
        WHERE (?1 IS NULL OR donor_id = ?1)
          AND (?2 IS NULL OR hospital_id = ?2)
        "#,
    )
    .bind(donor_filter)
    .bind(hospital_filter)
    .fetch_one(&pool)
    .await?;

    let donations = sqlx::query_as::<_, DonationRecordView>(
        r#"
        SELECT dr.id, dr.donor_id, d.full_name AS donor_name,
               dr.hospital_id, h.name AS hospital_name,
               dr.request_id, dr.donation_date, dr.quantity_units, dr.notes, dr.created_at
        FROM donation_records dr
        JOIN donors d ON d.id = dr.donor_id
        JOIN hospitals h ON h.id = dr.hospital_id
        WHERE (?1 IS NULL OR dr.donor_id = ?1)
          AND (?2 IS NULL OR dr.hospital_id = ?2)
        ORDER BY dr.donation_date DESC, dr.created_at DESC
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(donor_filter)
    .bind(hospital_filter)
    .bind(query.pagination.per_page())
    .bind(query.pagination.offset())
    .fetch_all(&pool)
    .await?;

    let pagination =
        PaginationMetadata::new(query.pagination.page(), query.pagination.per_page(), total);

    Ok(ListDonationsResponse {
        donations,
        pagination,
    })
}

// ============================================================================
// Tests
// ============================================================================
