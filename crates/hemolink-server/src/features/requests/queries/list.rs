use hemolink_common::types::{BloodGroup, RequestStatus, Role, UrgencyLevel};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::get::BloodRequestDetails;
use crate::cqrs::middleware::Query;
use crate::features::shared::pagination::{PaginationError, PaginationMetadata, PaginationParams};

// ============================================================================
// Query
// ============================================================================

/// Lists requests, most urgent first, newest first within an urgency.
///
/// Hospitals see their own board; admins see everything. Donors work from
/// their matches instead and are refused here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBloodRequests {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub status: Option<RequestStatus>,
    pub blood_group: Option<BloodGroup>,
    pub urgency: Option<UrgencyLevel>,
    pub pagination: PaginationParams,
}

impl Query for ListBloodRequests {}

impl mediator::Request<Result<ListBloodRequestsResponse, ListBloodRequestsError>>
    for ListBloodRequests
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBloodRequestsResponse {
    pub requests: Vec<BloodRequestDetails>,
    pub pagination: PaginationMetadata,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ListBloodRequestsError {
    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),

    #[error("donors browse their matches, not the request board")]
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
    query: ListBloodRequests,
) -> Result<ListBloodRequestsResponse, ListBloodRequestsError> {
    query.pagination.validate()?;

    let hospital_filter = match query.caller_role {
        Role::Admin => None,
        Role::Hospital => Some(query.caller_id),
        Role::Donor => return Err(ListBloodRequestsError::NotAuthorized),
    };

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM blood_requests r
        WHERE (?1 IS NULL OR r.hospital_id = ?1)
          AND (?2 IS NULL OR r.status = ?2)
          AND (?3 IS NULL OR r.blood_group = ?3)
          AND (?4 IS NULL OR r.urgency = ?4)
        "#,
    )
    .bind(hospital_filter)
    .bind(query.status)
    .bind(query.blood_group)
    .bind(query.urgency)
    .fetch_one(&pool)
    .await?;

    let requests = sqlx::query_as::<_, BloodRequestDetails>(
        r#"
        SELECT r.id, r.hospital_id, h.name AS hospital_name, h.city AS hospital_city,
               r.blood_group, r.quantity_units, r.urgency, r.status, r.notes, r.created_at
        FROM blood_requests r
        JOIN hospitals h ON h.id = r.hospital_id
        WHERE (?1 IS NULL OR r.hospital_id = ?1)
          AND (?2 IS NULL OR r.status = ?2)
          AND (?3 IS NULL OR r.blood_group = ?3)
          AND (?4 IS NULL OR r.urgency = ?4)
        ORDER BY CASE r.urgency
                     WHEN 'critical' THEN 0
                     WHEN 'high' THEN 1
                     WHEN 'medium' THEN 2
                     ELSE 3
                 END,
                 r.created_at DESC
        LIMIT ?5 OFFSET ?6
        "#,
    )
    .bind(hospital_filter)
    .bind(query.status)
    .bind(query.blood_group)
    .bind(query.urgency)
    .bind(query.pagination.per_page())
    .bind(query.pagination.offset())
    .fetch_all(&pool)
    .await?;

    let pagination =
        PaginationMetadata::new(query.pagination.page(), query.pagination.per_page(), total);

    Ok(ListBloodRequestsResponse {
        requests,
        pagination,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{memory_pool, seed_hospital, seed_request};

    #[tokio::test]
    async fn board_orders_by_urgency_then_recency() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::APositive,
            UrgencyLevel::Low,
            RequestStatus::Pending,
        )
        .await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::Critical,
            RequestStatus::Pending,
        )
        .await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::BNegative,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;

        let response = handle(
            pool.clone(),
            ListBloodRequests {
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
                status: None,
                blood_group: None,
                urgency: None,
                pagination: PaginationParams::default(),
            },
        )
        .await
        .unwrap();

        let urgencies: Vec<UrgencyLevel> =
            response.requests.iter().map(|r| r.urgency).collect();
        assert_eq!(
            urgencies,
            vec![UrgencyLevel::Critical, UrgencyLevel::High, UrgencyLevel::Low]
        );
    }

    #[tokio::test]
    async fn hospital_sees_only_its_own_board() {
        let pool = memory_pool().await;
        let mine = seed_hospital(&pool, "City General", "Springfield").await;
        let theirs = seed_hospital(&pool, "Mercy West", "Shelbyville").await;
        seed_request(
            &pool,
            mine,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;
        seed_request(
            &pool,
            theirs,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;

        let response = handle(
            pool.clone(),
            ListBloodRequests {
                caller_id: mine,
                caller_role: Role::Hospital,
                status: None,
                blood_group: None,
                urgency: None,
                pagination: PaginationParams::default(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.pagination.total, 1);
        assert_eq!(response.requests[0].hospital_id, mine);
    }

    #[tokio::test]
    async fn filters_narrow_the_board() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Fulfilled,
        )
        .await;
        seed_request(
            &pool,
            hospital_id,
            BloodGroup::AbNegative,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;

        let response = handle(
            pool.clone(),
            ListBloodRequests {
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
                status: Some(RequestStatus::Pending),
                blood_group: Some(BloodGroup::OPositive),
                urgency: None,
                pagination: PaginationParams::default(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.pagination.total, 1);
        assert_eq!(response.requests[0].status, RequestStatus::Pending);
        assert_eq!(response.requests[0].blood_group, BloodGroup::OPositive);
    }

    #[tokio::test]
    async fn donors_are_turned_away() {
        let pool = memory_pool().await;

        let error = handle(
            pool.clone(),
            ListBloodRequests {
                caller_id: Uuid::new_v4(),
                caller_role: Role::Donor,
                status: None,
                blood_group: None,
                urgency: None,
                pagination: PaginationParams::default(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, ListBloodRequestsError::NotAuthorized));
    }
}
