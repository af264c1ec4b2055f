use hemolink_common::types::{BloodGroup, RequestStatus, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;
use crate::features::matches::matching::run_matching_pass;

// ============================================================================
// Command
// ============================================================================

/// Re-runs the matching pass for an open request.
///
/// Useful when the donor pool has changed since the request was raised;
/// donors already paired with the request are never proposed twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RematchBloodRequest {
    pub request_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

impl Command for RematchBloodRequest {}

impl mediator::Request<Result<RematchBloodRequestResponse, RematchBloodRequestError>>
    for RematchBloodRequest
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RematchBloodRequestResponse {
    pub request_id: Uuid,
    pub matches_created: usize,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RematchBloodRequestError {
    #[error("request {0} not found")]
    NotFound(Uuid),

    #[error("only admins re-run matching")]
    NotAuthorized,

    #[error("request is {status}, matching only runs for open requests")]
    NotOpen { status: RequestStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: RematchBloodRequest,
) -> Result<RematchBloodRequestResponse, RematchBloodRequestError> {
    if command.caller_role != Role::Admin {
        return Err(RematchBloodRequestError::NotAuthorized);
    }

    let (blood_group, status): (BloodGroup, RequestStatus) =
        sqlx::query_as("SELECT blood_group, status FROM blood_requests WHERE id = ?1")
            .bind(command.request_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(RematchBloodRequestError::NotFound(command.request_id))?;

    if status.is_terminal() {
        return Err(RematchBloodRequestError::NotOpen { status });
    }

    let mut tx = pool.begin().await?;
    let proposed = run_matching_pass(
        &mut tx,
        command.request_id,
        blood_group,
        chrono::Utc::now().date_naive(),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        request_id = %command.request_id,
        matches_created = proposed.len(),
        "matching re-run"
    );

    Ok(RematchBloodRequestResponse {
        request_id: command.request_id,
        matches_created: proposed.len(),
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
    use hemolink_common::types::{AvailabilityStatus, MatchStatus, UrgencyLevel};

    #[tokio::test]
    async fn rematch_picks_up_donors_who_joined_later() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;
        let already_paired = seed_donor(
            &pool,
            "paired@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;
        seed_match(&pool, already_paired, request_id, MatchStatus::Pending).await;

        let newcomer = seed_donor(
            &pool,
            "newcomer@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let response = handle(
            pool.clone(),
            RematchBloodRequest {
                request_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.matches_created, 1);
        let paired: Vec<Uuid> = sqlx::query_scalar(
            "SELECT donor_id FROM donor_matches WHERE request_id = ?1 ORDER BY created_at",
        )
        .bind(request_id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert!(paired.contains(&newcomer));
        assert_eq!(paired.len(), 2);
    }

    #[tokio::test]
    async fn closed_requests_are_not_rematched() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::ANegative,
            UrgencyLevel::Medium,
            RequestStatus::Cancelled,
        )
        .await;

        let error = handle(
            pool.clone(),
            RematchBloodRequest {
                request_id,
                caller_id: Uuid::new_v4(),
                caller_role: Role::Admin,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            RematchBloodRequestError::NotOpen { status: RequestStatus::Cancelled }
        ));
    }

    #[tokio::test]
    async fn hospitals_cannot_rerun_matching() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let request_id = seed_request(
            &pool,
            hospital_id,
            BloodGroup::OPositive,
            UrgencyLevel::High,
            RequestStatus::Pending,
        )
        .await;

        let error = handle(
            pool.clone(),
            RematchBloodRequest {
                request_id,
                caller_id: hospital_id,
                caller_role: Role::Hospital,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(error, RematchBloodRequestError::NotAuthorized));
    }
}
