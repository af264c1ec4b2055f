//! Set a donor's availability.
//!
//! Availability is donor-managed. Flipping to `available` does not bypass
//! the re-donation window: the matching pass checks the window against
//! `last_donation_date` independently.

use hemolink_common::types::{AvailabilityStatus, Role};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SetDonorAvailability {
    pub donor_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub availability: AvailabilityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDonorAvailabilityResponse {
    pub id: Uuid,
    pub availability_status: AvailabilityStatus,
}

#[derive(Error, Debug)]
pub enum SetDonorAvailabilityError {
    #[error("only the donor or an admin may change availability")]
    NotAuthorized,

    #[error("donor {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SetDonorAvailabilityResponse, SetDonorAvailabilityError>>
    for SetDonorAvailability
{
}

impl crate::cqrs::middleware::Command for SetDonorAvailability {}

#[tracing::instrument(
    skip(pool, command),
    fields(donor_id = %command.donor_id, availability = %command.availability)
)]
pub async fn handle(
    pool: SqlitePool,
    command: SetDonorAvailability,
) -> Result<SetDonorAvailabilityResponse, SetDonorAvailabilityError> {
    let is_owner = command.caller_role == Role::Donor && command.caller_id == command.donor_id;
    if !is_owner && command.caller_role != Role::Admin {
        return Err(SetDonorAvailabilityError::NotAuthorized);
    }

    let result = sqlx::query("UPDATE donors SET availability_status = ?2 WHERE id = ?1")
        .bind(command.donor_id)
        .bind(command.availability)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(SetDonorAvailabilityError::NotFound(command.donor_id));
    }

    tracing::info!(donor_id = %command.donor_id, availability = %command.availability, "donor availability changed");

    Ok(SetDonorAvailabilityResponse {
        id: command.donor_id,
        availability_status: command.availability,
    })
}
