//! Register a hospital in the directory.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::error_helpers::is_unique_violation;
use crate::features::shared::validation::{
    validate_name, validate_phone, NameValidationError, PhoneValidationError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterHospital {
    pub name: String,
    pub city: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterHospitalResponse {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RegisterHospitalError {
    #[error("invalid name: {0}")]
    InvalidName(NameValidationError),

    #[error("invalid city: {0}")]
    InvalidCity(NameValidationError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneValidationError),

    #[error("hospital '{name}' in {city} is already registered")]
    Duplicate { name: String, city: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RegisterHospitalResponse, RegisterHospitalError>> for RegisterHospital {}

impl crate::cqrs::middleware::Command for RegisterHospital {}

impl RegisterHospital {
    pub fn validate(&self) -> Result<(), RegisterHospitalError> {
        validate_name(&self.name).map_err(RegisterHospitalError::InvalidName)?;
        validate_name(&self.city).map_err(RegisterHospitalError::InvalidCity)?;
        validate_phone(&self.phone)?;
        Ok(())
    }
}

#[tracing::instrument(skip(pool, command), fields(name = %command.name, city = %command.city))]
pub async fn handle(
    pool: SqlitePool,
    command: RegisterHospital,
) -> Result<RegisterHospitalResponse, RegisterHospitalError> {
    command.validate()?;

    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let name = command.name.trim().to_string();
    let city = command.city.trim().to_string();
    let phone = command.phone.trim().to_string();

    sqlx::query(
        "INSERT INTO hospitals (id, name, city, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(&name)
    .bind(&city)
    .bind(&phone)
    .bind(created_at)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            RegisterHospitalError::Duplicate {
                name: name.clone(),
                city: city.clone(),
            }
        } else {
            RegisterHospitalError::Database(e)
        }
    })?;

    tracing::info!(hospital_id = %id, "hospital registered");

    Ok(RegisterHospitalResponse {
        id,
        name,
        city,
        phone,
        created_at,
    })
}
