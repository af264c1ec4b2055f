//! Fetch a single donor.
//!
//! Contact fields are included only for the donor themselves and admins;
//! hospitals go through the dedicated contact endpoint, which checks for
//! an active match.

use chrono::{DateTime, NaiveDate, Utc};
use hemolink_common::types::{next_eligible_date, AvailabilityStatus, BloodGroup, Role};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GetDonor {
    pub donor_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct DonorDetails {
    pub id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub blood_group: BloodGroup,
    pub availability_status: AvailabilityStatus,
    pub last_donation_date: Option<NaiveDate>,
    pub next_eligible_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum GetDonorError {
    #[error("donors may only view their own profile")]
    NotAuthorized,

    #[error("donor {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DonorDetails, GetDonorError>> for GetDonor {}

impl crate::cqrs::middleware::Query for GetDonor {}

#[derive(Debug, sqlx::FromRow)]
struct DonorRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: String,
    blood_group: BloodGroup,
    availability_status: AvailabilityStatus,
    last_donation_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

#[tracing::instrument(skip(pool, query), fields(donor_id = %query.donor_id))]
pub async fn handle(pool: SqlitePool, query: GetDonor) -> Result<DonorDetails, GetDonorError> {
    if query.caller_role == Role::Donor && query.caller_id != query.donor_id {
        return Err(GetDonorError::NotAuthorized);
    }

    let row = sqlx::query_as::<_, DonorRow>(
        "SELECT id, full_name, email, phone, blood_group, availability_status,
                last_donation_date, created_at
         FROM donors WHERE id = ?1",
    )
    .bind(query.donor_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDonorError::NotFound(query.donor_id))?;

    let sees_contact =
        query.caller_role == Role::Admin || query.caller_id == row.id;

    Ok(DonorDetails {
        id: row.id,
        full_name: row.full_name,
        email: sees_contact.then_some(row.email),
        phone: sees_contact.then_some(row.phone),
        blood_group: row.blood_group,
        availability_status: row.availability_status,
        next_eligible_date: row.last_donation_date.and_then(next_eligible_date),
        last_donation_date: row.last_donation_date,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{memory_pool, seed_donor};

    #[tokio::test]
    async fn test_owner_sees_contact_fields() {
        let pool = memory_pool().await;
        let donor_id = seed_donor(
            &pool,
            "own@example.com",
            BloodGroup::ONegative,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let details = handle(
            pool,
            GetDonor {
                donor_id,
                caller_id: donor_id,
                caller_role: Role::Donor,
            },
        )
        .await
        .unwrap();
        assert_eq!(details.email.as_deref(), Some("own@example.com"));
        assert!(details.phone.is_some());
        assert!(details.next_eligible_date.is_none());
    }

    #[tokio::test]
    async fn test_hospital_view_omits_contact() {
        let pool = memory_pool().await;
        let donor_id = seed_donor(
            &pool,
            "own@example.com",
            BloodGroup::ONegative,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let details = handle(
            pool,
            GetDonor {
                donor_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap();
        assert!(details.email.is_none());
        assert!(details.phone.is_none());
        assert_eq!(details.blood_group, BloodGroup::ONegative);
    }

    #[tokio::test]
    async fn test_donor_cannot_view_other_donor() {
        let pool = memory_pool().await;
        let donor_id = seed_donor(
            &pool,
            "own@example.com",
            BloodGroup::ONegative,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let err = handle(
            pool,
            GetDonor {
                donor_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Donor,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GetDonorError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_next_eligible_date_derived_from_last_donation() {
        let pool = memory_pool().await;
        let last = chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let donor_id = seed_donor(
            &pool,
            "d@example.com",
            BloodGroup::APositive,
            AvailabilityStatus::RecentlyDonated,
            Some(last),
        )
        .await;

        let details = handle(
            pool,
            GetDonor {
                donor_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            details.next_eligible_date,
            chrono::NaiveDate::from_ymd_opt(2025, 4, 15)
        );
    }

    #[tokio::test]
    async fn test_missing_donor_is_not_found() {
        let pool = memory_pool().await;
        let err = handle(
            pool,
            GetDonor {
                donor_id: Uuid::new_v4(),
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GetDonorError::NotFound(_)));
    }
}
