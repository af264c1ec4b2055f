//! List hospitals with optional filters.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::pagination::{PaginationError, PaginationMetadata, PaginationParams};

#[derive(Debug, Clone)]
pub struct ListHospitals {
    pub pagination: PaginationParams,
    /// Exact city match, case-insensitive.
    pub city: Option<String>,
    /// Case-insensitive substring match on the hospital name.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HospitalSummary {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListHospitalsResponse {
    pub hospitals: Vec<HospitalSummary>,
    pub pagination: PaginationMetadata,
}

#[derive(Error, Debug)]
pub enum ListHospitalsError {
    #[error("invalid pagination: {0}")]
    InvalidPagination(#[from] PaginationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListHospitalsResponse, ListHospitalsError>> for ListHospitals {}

impl crate::cqrs::middleware::Query for ListHospitals {}

#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: SqlitePool,
    query: ListHospitals,
) -> Result<ListHospitalsResponse, ListHospitalsError> {
    query.pagination.validate()?;

    let city = query.city.as_ref().map(|s| s.trim().to_lowercase());
    let name_pattern = query
        .search
        .as_ref()
        .map(|s| format!("%{}%", s.trim().to_lowercase()));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM hospitals
         WHERE (?1 IS NULL OR LOWER(city) = ?1)
           AND (?2 IS NULL OR LOWER(name) LIKE ?2)",
    )
    .bind(&city)
    .bind(&name_pattern)
    .fetch_one(&pool)
    .await?;

    let hospitals = sqlx::query_as::<_, HospitalSummary>(
        "SELECT id, name, city, phone, created_at FROM hospitals
         WHERE (?1 IS NULL OR LOWER(city) = ?1)
           AND (?2 IS NULL OR LOWER(name) LIKE ?2)
         ORDER BY name ASC
         LIMIT ?3 OFFSET ?4",
    )
    .bind(&city)
    .bind(&name_pattern)
    .bind(query.pagination.per_page())
    .bind(query.pagination.offset())
    .fetch_all(&pool)
    .await?;

    Ok(ListHospitalsResponse {
        hospitals,
        pagination: PaginationMetadata::new(
            query.pagination.page(),
            query.pagination.per_page(),
            total,
        ),
    })
}
