use chrono::{DateTime, Utc};
use hemolink_common::types::{BloodGroup, MatchStatus, Role, UrgencyLevel};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Query;

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMatch {
    pub match_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

impl Query for GetMatch {}

impl mediator::Request<Result<MatchDetails, GetMatchError>> for GetMatch {}

// ============================================================================
// Response
// ============================================================================

/// A match joined with the donor and request it pairs, as shown to the
/// parties involved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchDetails {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: String,
    pub blood_group: BloodGroup,
    pub request_id: Uuid,
    pub hospital_id: Uuid,
    pub hospital_name: String,
    pub quantity_units: i64,
    pub urgency: UrgencyLevel,
    pub status: MatchStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GetMatchError {
    #[error("match {0} not found")]
    NotFound(Uuid),

    #[error("caller is not a party to this match")]
    NotAuthorized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: SqlitePool, query: GetMatch) -> Result<MatchDetails, GetMatchError> {
    let details = sqlx::query_as::<_, MatchDetails>(
        r#"
        SELECT m.id, m.donor_id, d.full_name AS donor_name, d.blood_group,
               m.request_id, r.hospital_id, h.name AS hospital_name,
               r.quantity_units, r.urgency, m.status, m.notes, m.created_at
        FROM donor_matches m
        JOIN donors d ON d.id = m.donor_id
        JOIN blood_requests r ON r.id = m.request_id
        JOIN hospitals h ON h.id = r.hospital_id
        WHERE m.id = ?1
        "#,
    )
    .bind(query.match_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetMatchError::NotFound(query.match_id))?;

    let allowed = match query.caller_role {
        Role::Admin => true,
        Role::Donor => query.caller_id == details.donor_id,
        Role::Hospital => query.caller_id == details.hospital_id,
    };
    if !allowed {
        return Err(GetMatchError::NotAuthorized);
    }

    Ok(details)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{
        memory_pool, seed_donor, seed_hospital, seed_match, seed_request,
    };
    use hemolink_common::types::{AvailabilityStatus, RequestStatus};

    #[tokio::test]
    async fn parties_to_the_match_see_the_joined_view() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::AbPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::AbPositive,
            UrgencyLevel::Critical,
            RequestStatus::Pending,
        )
        .await;
        let match_id = seed_match(&pool, donor_id, request_id, MatchStatus::Pending).await;

        let details = handle(
            pool.clone(),
            GetMatch {
                match_id,
                caller_id: donor_id,
                caller_role: Role::Donor,
            },
        )
        .await
        .unwrap();

        assert_eq!(details.donor_name, "Test Donor");
        assert_eq!(details.hospital_name, "City General");
        assert_eq!(details.quantity_units, 2);
        assert_eq!(details.urgency, UrgencyLevel::Critical);

        // The hospital side sees the same record.
        let as_hospital = handle(
            pool.clone(),
            GetMatch {
                match_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap();
        assert_eq!(as_hospital.id, details.id);
    }

    #[tokio::test]
    async fn outsiders_are_refused() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::Low,
            RequestStatus::Pending,
        )
        .await;
        let match_id = seed_match(&pool, donor_id, request_id, MatchStatus::Pending).await;
        let other_hospital = seed_hospital(&pool, "Mercy West", "Shelbyville").await;

        let error = handle(
            pool.clone(),
            GetMatch {
                match_id,
                caller_id: other_hospital,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, GetMatchError::NotAuthorized));
    }

    #[tokio::test]
    async fn missing_match_is_not_found() {
        let pool = memory_pool().await;
        let missing = Uuid::new_v4();

        let error = handle(
            pool.clone(),
            GetMatch {
                match_id: missing,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, GetMatchError::NotFound(id) if id == missing));
    }
}
