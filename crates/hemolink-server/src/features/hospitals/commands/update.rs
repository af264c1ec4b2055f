//! Update a hospital's directory entry.

use chrono::{DateTime, Utc};
use hemolink_common::types::Role;
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::error_helpers::is_unique_violation;
use crate::features::shared::validation::{
    validate_name, validate_phone, NameValidationError, PhoneValidationError,
};

#[derive(Debug, Clone)]
pub struct UpdateHospital {
    pub hospital_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateHospitalResponse {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum UpdateHospitalError {
    #[error("invalid name: {0}")]
    InvalidName(NameValidationError),

    #[error("invalid city: {0}")]
    InvalidCity(NameValidationError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneValidationError),

    #[error("only the hospital or an admin may update this entry")]
    NotAuthorized,

    #[error("hospital {0} not found")]
    NotFound(Uuid),

    #[error("another hospital with this name already exists in this city")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<UpdateHospitalResponse, UpdateHospitalError>> for UpdateHospital {}

impl crate::cqrs::middleware::Command for UpdateHospital {}

impl UpdateHospital {
    pub fn validate(&self) -> Result<(), UpdateHospitalError> {
        if let Some(name) = &self.name {
            validate_name(name).map_err(UpdateHospitalError::InvalidName)?;
        }
        if let Some(city) = &self.city {
            validate_name(city).map_err(UpdateHospitalError::InvalidCity)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HospitalRow {
    id: Uuid,
    name: String,
    city: String,
    phone: String,
    created_at: DateTime<Utc>,
}

#[tracing::instrument(skip(pool, command), fields(hospital_id = %command.hospital_id))]
pub async fn handle(
    pool: SqlitePool,
    command: UpdateHospital,
) -> Result<UpdateHospitalResponse, UpdateHospitalError> {
    let is_owner =
        command.caller_role == Role::Hospital && command.caller_id == command.hospital_id;
    if !is_owner && command.caller_role != Role::Admin {
        return Err(UpdateHospitalError::NotAuthorized);
    }
    command.validate()?;

    let result = sqlx::query(
        "UPDATE hospitals SET
             name = COALESCE(?2, name),
             city = COALESCE(?3, city),
             phone = COALESCE(?4, phone)
         WHERE id = ?1",
    )
    .bind(command.hospital_id)
    .bind(command.name.as_ref().map(|s| s.trim().to_string()))
    .bind(command.city.as_ref().map(|s| s.trim().to_string()))
    .bind(command.phone.as_ref().map(|s| s.trim().to_string()))
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            UpdateHospitalError::Duplicate
        } else {
            UpdateHospitalError::Database(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(UpdateHospitalError::NotFound(command.hospital_id));
    }

    let row: HospitalRow = sqlx::query_as(
        "SELECT id, name, city, phone, created_at FROM hospitals WHERE id = ?1",
    )
    .bind(command.hospital_id)
    .fetch_one(&pool)
    .await?;

    Ok(UpdateHospitalResponse {
        id: row.id,
        name: row.name,
        city: row.city,
        phone: row.phone,
        created_at: row.created_at,
    })
}
