use hemolink_common::types::{RequestStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;

// ============================================================================
// Command
// ============================================================================

/// Withdraws an open blood request and its open match proposals.
///
/// A request with a confirmed donor cannot be withdrawn silently; the
/// confirmed match must be cancelled first so the donor is told.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBloodRequest {
    pub request_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

impl Command for CancelBloodRequest {}

impl mediator::Request<Result<CancelBloodRequestResponse, CancelBloodRequestError>>
    for CancelBloodRequest
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBloodRequestResponse {
    pub id: Uuid,
    pub status: RequestStatus,
    pub cancelled_matches: u64,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CancelBloodRequestError {
    #[error("request {0} not found")]
    NotFound(Uuid),

    #[error("only the owning hospital or an admin may cancel a request")]
    NotAuthorized,

    #[error("cannot cancel a {status} request")]
    NotCancellable { status: RequestStatus },

    #[error("request has a confirmed donor; cancel that match first")]
    ConfirmedMatchOutstanding,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    hospital_id: Uuid,
    status: RequestStatus,
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: CancelBloodRequest,
) -> Result<CancelBloodRequestResponse, CancelBloodRequestError> {
    let row = sqlx::query_as::<_, RequestRow>(
        "SELECT id, hospital_id, status FROM blood_requests WHERE id = ?1",
    )
    .bind(command.request_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(CancelBloodRequestError::NotFound(command.request_id))?;

    let authorized = match command.caller_role {
        Role::Admin => true,
        Role::Hospital => command.caller_id == row.hospital_id,
        Role::Donor => false,
    };
    if !authorized {
        return Err(CancelBloodRequestError::NotAuthorized);
    }

    if !row.status.can_transition_to(RequestStatus::Cancelled) {
        return Err(CancelBloodRequestError::NotCancellable { status: row.status });
    }

    let confirmed_outstanding: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM donor_matches WHERE request_id = ?1 AND status = 'confirmed')",
    )
    .bind(row.id)
    .fetch_one(&pool)
    .await?;
    if confirmed_outstanding {
        return Err(CancelBloodRequestError::ConfirmedMatchOutstanding);
    }

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE blood_requests SET status = 'cancelled' WHERE id = ?1")
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        r#"
        UPDATE donor_matches
        SET status = 'cancelled'
        WHERE request_id = ?1 AND status IN ('pending', 'contacted')
        "#,
    )
    .bind(row.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %row.id,
        cancelled_matches = result.rows_affected(),
        "blood request cancelled"
    );

    Ok(CancelBloodRequestResponse {
        id: row.id,
        status: RequestStatus::Cancelled,
        cancelled_matches: result.rows_affected(),
    })
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
    use hemolink_common::types::{AvailabilityStatus, BloodGroup, MatchStatus, UrgencyLevel};

    #[tokio::test]
    async fn hospital_cancels_its_open_request_and_open_matches() {
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
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;
        let match_id = seed_match(&pool, donor_id, request_id, MatchStatus::Contacted).await;

        let response = handle(
            pool.clone(),
            CancelBloodRequest {
                request_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.status, RequestStatus::Cancelled);
        assert_eq!(response.cancelled_matches, 1);

        let match_status: MatchStatus =
            sqlx::query_scalar("SELECT status FROM donor_matches WHERE id = ?1")
                .bind(match_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(match_status, MatchStatus::Cancelled);
    }

    #[tokio::test]
    async fn confirmed_donor_blocks_cancellation() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Unavailable,
            None,
        )
        .await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Matched,
        )
        .await;
        seed_match(&pool, donor_id, request_id, MatchStatus::Confirmed).await;

        let error = handle(
            pool.clone(),
            CancelBloodRequest {
                request_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            CancelBloodRequestError::ConfirmedMatchOutstanding
        ));

        let status: RequestStatus =
            sqlx::query_scalar("SELECT status FROM blood_requests WHERE id = ?1")
                .bind(request_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, RequestStatus::Matched);
    }

    #[tokio::test]
    async fn fulfilled_request_cannot_be_cancelled() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::BNegative,
            UrgencyLevel::Low,
            RequestStatus::Fulfilled,
        )
        .await;

        let error = handle(
            pool.clone(),
            CancelBloodRequest {
                request_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            CancelBloodRequestError::NotCancellable { status: RequestStatus::Fulfilled }
        ));
    }

    #[tokio::test]
    async fn foreign_hospital_and_donors_are_refused() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let other = seed_hospital(&pool, "Mercy West", "Shelbyville").await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::APositive,
            UrgencyLevel::Medium,
            RequestStatus::Pending,
        )
        .await;

        let error = handle(
            pool.clone(),
            CancelBloodRequest {
                request_id,
                caller_id: other,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(error, CancelBloodRequestError::NotAuthorized));

        let error = handle(
            pool.clone(),
            CancelBloodRequest {
                request_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Donor,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(error, CancelBloodRequestError::NotAuthorized));
    }
}
