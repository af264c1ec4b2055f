//! Update a donor's profile.
//!
//! Only the donor themselves or an admin may update a profile. Email is
//! the donor's stable identity and cannot change here.

use chrono::{DateTime, NaiveDate, Utc};
use hemolink_common::types::{AvailabilityStatus, BloodGroup, Role};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::validation::{
    validate_name, validate_phone, NameValidationError, PhoneValidationError,
};

#[derive(Debug, Clone)]
pub struct UpdateDonorProfile {
    pub donor_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub blood_group: Option<BloodGroup>,
    /// Records a donation made outside the system. Moves the eligibility
    /// window; never cleared through this command.
    pub last_donation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateDonorProfileResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub availability_status: AvailabilityStatus,
    pub last_donation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum UpdateDonorProfileError {
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameValidationError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneValidationError),

    #[error("last donation date {0} is in the future")]
    FutureDonationDate(NaiveDate),

    #[error("only the donor or an admin may update this profile")]
    NotAuthorized,

    #[error("donor {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UpdateDonorProfileResponse, UpdateDonorProfileError>> for UpdateDonorProfile {}

impl crate::cqrs::middleware::Command for UpdateDonorProfile {}

impl UpdateDonorProfile {
    pub fn validate(&self) -> Result<(), UpdateDonorProfileError> {
        if let Some(name) = &self.full_name {
            validate_name(name)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(date) = self.last_donation_date {
            if date > Utc::now().date_naive() {
                return Err(UpdateDonorProfileError::FutureDonationDate(date));
            }
        }
        Ok(())
    }

    fn authorize(&self) -> Result<(), UpdateDonorProfileError> {
        let is_owner = self.caller_role == Role::Donor && self.caller_id == self.donor_id;
        if is_owner || self.caller_role == Role::Admin {
            Ok(())
        } else {
            Err(UpdateDonorProfileError::NotAuthorized)
        }
    }
}

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

#[tracing::instrument(skip(pool, command), fields(donor_id = %command.donor_id))]
pub async fn handle(
    pool: SqlitePool,
    command: UpdateDonorProfile,
) -> Result<UpdateDonorProfileResponse, UpdateDonorProfileError> {
    command.authorize()?;
    command.validate()?;

    let result = sqlx::query(
        "UPDATE donors SET
             full_name = COALESCE(?2, full_name),
             phone = COALESCE(?3, phone),
             blood_group = COALESCE(?4, blood_group),
             last_donation_date = COALESCE(?5, last_donation_date)
         WHERE id = ?1",
    )
    .bind(command.donor_id)
    .bind(command.full_name.as_ref().map(|s| s.trim().to_string()))
    .bind(command.phone.as_ref().map(|s| s.trim().to_string()))
    .bind(command.blood_group)
    .bind(command.last_donation_date)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(UpdateDonorProfileError::NotFound(command.donor_id));
    }

    let row: DonorRow = sqlx::query_as(
        "SELECT id, full_name, email, phone, blood_group, availability_status,
                last_donation_date, created_at
         FROM donors WHERE id = ?1",
    )
    .bind(command.donor_id)
    .fetch_one(&pool)
    .await?;

    tracing::debug!(donor_id = %row.id, "donor profile updated");

    Ok(UpdateDonorProfileResponse {
        id: row.id,
        full_name: row.full_name,
        email: row.email,
        phone: row.phone,
        blood_group: row.blood_group,
        availability_status: row.availability_status,
        last_donation_date: row.last_donation_date,
        created_at: row.created_at,
    })
}
