use chrono::{DateTime, Utc};
use hemolink_common::types::{BloodGroup, RequestStatus, Role, UrgencyLevel};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::cqrs::middleware::Command;
use crate::features::matches::matching::run_matching_pass;
use crate::features::shared::validation::{
    validate_notes, validate_quantity, NotesValidationError, QuantityValidationError,
};

// ============================================================================
// Command
// ============================================================================

/// Raises a blood request and immediately runs a matching pass for it.
///
/// Hospitals raise requests for themselves; admins must name the hospital.
/// The request starts out pending even when the pass proposes donors, and
/// advances to matched only through a confirmation or an admin decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBloodRequest {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub hospital_id: Option<Uuid>,
    pub blood_group: BloodGroup,
    pub quantity_units: i64,
    pub urgency: Option<UrgencyLevel>,
    pub notes: Option<String>,
}

impl Command for CreateBloodRequest {}

impl mediator::Request<Result<CreateBloodRequestResponse, CreateBloodRequestError>>
    for CreateBloodRequest
{
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBloodRequestResponse {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub blood_group: BloodGroup,
    pub quantity_units: i64,
    pub urgency: UrgencyLevel,
    pub status: RequestStatus,
    pub matches_created: usize,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CreateBloodRequestError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityValidationError),

    #[error("invalid notes: {0}")]
    InvalidNotes(#[from] NotesValidationError),

    #[error("only hospitals and admins may raise blood requests")]
    NotAuthorized,

    #[error("a hospital may only raise requests for itself")]
    ForeignHospital,

    #[error("an admin must name the hospital the request is for")]
    MissingHospital,

    #[error("hospital {0} not found")]
    HospitalNotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Handler
// ============================================================================

fn resolve_hospital(command: &CreateBloodRequest) -> Result<Uuid, CreateBloodRequestError> {
    match command.caller_role {
        Role::Hospital => match command.hospital_id {
            Some(id) if id != command.caller_id => Err(CreateBloodRequestError::ForeignHospital),
            _ => Ok(command.caller_id),
        },
        Role::Admin => command
            .hospital_id
            .ok_or(CreateBloodRequestError::MissingHospital),
        Role::Donor => Err(CreateBloodRequestError::NotAuthorized),
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: SqlitePool,
    command: CreateBloodRequest,
) -> Result<CreateBloodRequestResponse, CreateBloodRequestError> {
    let hospital_id = resolve_hospital(&command)?;
    validate_quantity(command.quantity_units)?;
    if let Some(notes) = &command.notes {
        validate_notes(notes)?;
    }

    let hospital_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = ?1)")
            .bind(hospital_id)
            .fetch_one(&pool)
            .await?;
    if !hospital_exists {
        return Err(CreateBloodRequestError::HospitalNotFound(hospital_id));
    }

    let id = Uuid::new_v4();
    let urgency = command.urgency.unwrap_or_default();
    let created_at = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO blood_requests (id, hospital_id, blood_group, quantity_units, urgency, status, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)
        "#,
    )
    .bind(id)
    .bind(hospital_id)
    .bind(command.blood_group)
    .bind(command.quantity_units)
    .bind(urgency)
    .bind(&command.notes)
    .bind(created_at)
    .execute(&mut *tx)
    .await?;

    let proposed =
        run_matching_pass(&mut tx, id, command.blood_group, created_at.date_naive()).await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %id,
        hospital_id = %hospital_id,
        blood_group = %command.blood_group,
        matches_created = proposed.len(),
        "blood request raised"
    );

    Ok(CreateBloodRequestResponse {
        id,
        hospital_id,
        blood_group: command.blood_group,
        quantity_units: command.quantity_units,
        urgency,
        status: RequestStatus::Pending,
        matches_created: proposed.len(),
        created_at,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{memory_pool, seed_donor, seed_hospital};
    use chrono::Duration;
    use hemolink_common::types::AvailabilityStatus;

    fn base_command(caller_id: Uuid, caller_role: Role) -> CreateBloodRequest {
        CreateBloodRequest {
            caller_id,
            caller_role,
            hospital_id: None,
            blood_group: BloodGroup::OPositive,
            quantity_units: 2,
            urgency: Some(UrgencyLevel::High),
            notes: None,
        }
    }

    #[tokio::test]
    async fn hospital_raises_request_and_matching_runs() {
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

        let response = handle(pool.clone(), base_command(hospital_id, Role::Hospital))
            .await
            .unwrap();

        assert_eq!(response.hospital_id, hospital_id);
        assert_eq!(response.matches_created, 1);
        // Proposals alone never advance the request.
        assert_eq!(response.status, RequestStatus::Pending);

        let stored: RequestStatus =
            sqlx::query_scalar("SELECT status FROM blood_requests WHERE id = ?1")
                .bind(response.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored, RequestStatus::Pending);

        let matched_donor: Uuid =
            sqlx::query_scalar("SELECT donor_id FROM donor_matches WHERE request_id = ?1")
                .bind(response.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(matched_donor, donor_id);
    }

    #[tokio::test]
    async fn request_is_created_even_when_no_donor_qualifies() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        seed_donor(
            &pool,
            "recent@example.com",
            BloodGroup::OPositive,
            AvailabilityStatus::Available,
            Some(Utc::now().date_naive() - Duration::days(10)),
        )
        .await;

        let response = handle(pool.clone(), base_command(hospital_id, Role::Hospital))
            .await
            .unwrap();

        assert_eq!(response.matches_created, 0);
        assert_eq!(response.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn hospital_cannot_raise_for_another_hospital() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;
        let other = seed_hospital(&pool, "Mercy West", "Shelbyville").await;

        let mut command = base_command(hospital_id, Role::Hospital);
        command.hospital_id = Some(other);

        let error = handle(pool.clone(), command).await.unwrap_err();
        assert!(matches!(error, CreateBloodRequestError::ForeignHospital));
    }

    #[tokio::test]
    async fn admin_must_name_the_hospital() {
        let pool = memory_pool().await;
        let admin = Uuid::new_v4();

        let error = handle(pool.clone(), base_command(admin, Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(error, CreateBloodRequestError::MissingHospital));
    }

    #[tokio::test]
    async fn admin_raises_on_behalf_of_a_hospital() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;

        let mut command = base_command(Uuid::new_v4(), Role::Admin);
        command.hospital_id = Some(hospital_id);

        let response = handle(pool.clone(), command).await.unwrap();
        assert_eq!(response.hospital_id, hospital_id);
    }

    #[tokio::test]
    async fn donors_cannot_raise_requests() {
        let pool = memory_pool().await;
        let donor_id = seed_donor(
            &pool,
            "donor@example.com",
            BloodGroup::APositive,
            AvailabilityStatus::Available,
            None,
        )
        .await;

        let error = handle(pool.clone(), base_command(donor_id, Role::Donor))
            .await
            .unwrap_err();
        assert!(matches!(error, CreateBloodRequestError::NotAuthorized));
    }

    #[tokio::test]
    async fn unknown_hospital_is_rejected() {
        let pool = memory_pool().await;
        let ghost = Uuid::new_v4();

        let mut command = base_command(Uuid::new_v4(), Role::Admin);
        command.hospital_id = Some(ghost);

        let error = handle(pool.clone(), command).await.unwrap_err();
        assert!(matches!(error, CreateBloodRequestError::HospitalNotFound(id) if id == ghost));
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;

        let mut command = base_command(hospital_id, Role::Hospital);
        command.quantity_units = 0;

        let error = handle(pool.clone(), command).await.unwrap_err();
        assert!(matches!(error, CreateBloodRequestError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn urgency_defaults_to_medium() {
        let pool = memory_pool().await;
        let hospital_id = seed_hospital(&pool, "City General", "Springfield").await;

        let mut command = base_command(hospital_id, Role::Hospital);
        command.urgency = None;

        let response = handle(pool.clone(), command).await.unwrap();
        assert_eq!(response.urgency, UrgencyLevel::Medium);
    }
}
