//! Register a new donor.

use chrono::{DateTime, NaiveDate, Utc};
use hemolink_common::types::{AvailabilityStatus, BloodGroup};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::error_helpers::is_unique_violation;
use crate::features::shared::validation::{
    validate_email, validate_name, validate_phone, EmailValidationError, NameValidationError,
    PhoneValidationError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDonor {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    /// Most recent donation before joining, if any. Feeds the eligibility
    /// window from day one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_donation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterDonorResponse {
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
pub enum RegisterDonorError {
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameValidationError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailValidationError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneValidationError),

    #[error("last donation date {0} is in the future")]
    FutureDonationDate(NaiveDate),

    #[error("a donor with email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RegisterDonorResponse, RegisterDonorError>> for RegisterDonor {}

impl crate::cqrs::middleware::Command for RegisterDonor {}

impl RegisterDonor {
    #[tracing::instrument(skip(self), fields(blood_group = %self.blood_group))]
    pub fn validate(&self) -> Result<(), RegisterDonorError> {
        validate_name(&self.full_name)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        if let Some(date) = self.last_donation_date {
            if date > Utc::now().date_naive() {
                return Err(RegisterDonorError::FutureDonationDate(date));
            }
        }
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(blood_group = %command.blood_group))]
pub async fn handle(
    pool: SqlitePool,
    command: RegisterDonor,
) -> Result<RegisterDonorResponse, RegisterDonorError> {
    command.validate()?;

    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let full_name = command.full_name.trim().to_string();
    let email = command.email.trim().to_lowercase();
    let phone = command.phone.trim().to_string();

    sqlx::query(
        "INSERT INTO donors
             (id, full_name, email, phone, blood_group, availability_status,
              last_donation_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(id)
    .bind(&full_name)
    .bind(&email)
    .bind(&phone)
    .bind(command.blood_group)
    .bind(AvailabilityStatus::Available)
    .bind(command.last_donation_date)
    .bind(created_at)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RegisterDonorError::DuplicateEmail(email.clone())
        } else {
            RegisterDonorError::Database(e)
        }
    })?;

    tracing::info!(donor_id = %id, "donor registered");

    Ok(RegisterDonorResponse {
        id,
        full_name,
        email,
        phone,
        blood_group: command.blood_group,
        availability_status: AvailabilityStatus::Available,
        last_donation_date: command.last_donation_date,
        created_at,
    })
}
