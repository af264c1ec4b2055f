//! Fetch a single hospital.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GetHospital {
    pub hospital_id: Uuid,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HospitalDetails {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum GetHospitalError {
    #[error("hospital {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<HospitalDetails, GetHospitalError>> for GetHospital {}

impl crate::cqrs::middleware::Query for GetHospital {}

#[tracing::instrument(skip(pool, query), fields(hospital_id = %query.hospital_id))]
pub async fn handle(
    pool: SqlitePool,
    query: GetHospital,
) -> Result<HospitalDetails, GetHospitalError> {
    sqlx::query_as::<_, HospitalDetails>(
        "SELECT id, name, city, phone, created_at FROM hospitals WHERE id = ?1",
    )
    .bind(query.hospital_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetHospitalError::NotFound(query.hospital_id))
}
