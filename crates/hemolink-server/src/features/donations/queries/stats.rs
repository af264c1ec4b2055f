use chrono::{NaiveDate, Utc};
use hemolink_common::types::{
    is_eligible_on, next_eligible_date, Role, LIVES_SAVED_PER_DONATION,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Query;

// ============================================================================
// Query
// ============================================================================

/// Derives a donor's statistics from the ledger and their profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDonorStats {
    pub donor_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

impl Query for GetDonorStats {}

impl mediator::Request<Result<DonorStats, GetDonorStatsError>> for GetDonorStats {}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorStats {
    pub donor_id: Uuid,
    pub total_donations: i64,
    pub total_units: i64,
    pub last_donation_date: Option<NaiveDate>,
    pub days_since_last_donation: Option<i64>,
    pub next_eligible_date: Option<NaiveDate>,
    pub eligible_now: bool,
    pub lives_saved: i64,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GetDonorStatsError {
    #[error("stats are visible to the donor themselves and to admins")]
    NotAuthorized,

    #[error("donor {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: GetDonorStats) -> Result<DonorStats, GetDonorStatsError> {
    let allowed = match query.caller_role {
        Role::Admin => true,
        Role::Donor => query.caller_id == query.donor_id,
        Role::Hospital => false,
    };
    if !allowed {
        return Err(GetDonorStatsError::NotAuthorized);
    }

    let last_donation_date: Option<NaiveDate> =
        sqlx::query_scalar("SELECT last_donation_date FROM donors WHERE id = ?1")
            .bind(query.donor_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(GetDonorStatsError::NotFound(query.donor_id))?;

    let (total_donations, total_units): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(quantity_units), 0) FROM donation_records WHERE donor_id = ?1",
    )
    .bind(query.donor_id)
    .fetch_one(&pool)
    .await?;

    let today = Utc::now().date_naive();
    let days_since_last_donation =
        last_donation_date.map(|last| (today - last).num_days());

    Ok(DonorStats {
        donor_id: query.donor_id,
        total_donations,
        total_units,
        last_donation_date,
        days_since_last_donation,
        next_eligible_date: last_donation_date.and_then(next_eligible_date),
        eligible_now: is_eligible_on(last_donation_date, today),
        lives_saved: total_donations * LIVES_SAVED_PER_DONATION,
    })
}

// ============================================================================
// Tests
// ============================================================================
