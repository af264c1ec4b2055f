//! List donors with optional filters.
//!
//! Hospital and admin only. Contact fields are never part of listings.

use chrono::{DateTime, NaiveDate, Utc};
use hemolink_common::types::{AvailabilityStatus, BloodGroup, Role};
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::shared::pagination::{PaginationError, PaginationMetadata, PaginationParams};

#[derive(Debug, Clone)]
pub struct ListDonors {
    pub caller_id: Uuid,
    pub caller_role: Role,
    pub pagination: PaginationParams,
    pub blood_group: Option<BloodGroup>,
    pub availability: Option<AvailabilityStatus>,
    /// Case-insensitive substring match on the donor's name.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DonorSummary {
    pub id: Uuid,
    pub full_name: String,
    pub blood_group: BloodGroup,
    pub availability_status: AvailabilityStatus,
    pub last_donation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDonorsResponse {
    pub donors: Vec<DonorSummary>,
    pub pagination: PaginationMetadata,
}

#[derive(Error, Debug)]
pub enum ListDonorsError {
    #[error("invalid pagination: {0}")]
    InvalidPagination(#[from] PaginationError),

    #[error("donor listings are restricted to hospitals and admins")]
    NotAuthorized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListDonorsResponse, ListDonorsError>> for ListDonors {}

impl crate::cqrs::middleware::Query for ListDonors {}

#[tracing::instrument(skip(pool, query), fields(caller_role = %query.caller_role))]
pub async fn handle(pool: SqlitePool, query: ListDonors) -> Result<ListDonorsResponse, ListDonorsError> {
    if !matches!(query.caller_role, Role::Hospital | Role::Admin) {
        return Err(ListDonorsError::NotAuthorized);
    }
    query.pagination.validate()?;

    let name_pattern = query
        .search
        .as_ref()
        .map(|s| format!("%{}%", s.trim().to_lowercase()));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM donors
         WHERE (?1 IS NULL OR blood_group = ?1)
           AND (?2 IS NULL OR availability_status = ?2)
           AND (?3 IS NULL OR LOWER(full_name) LIKE ?3)",
    )
    .bind(query.blood_group)
    .bind(query.availability)
    .bind(&name_pattern)
    .fetch_one(&pool)
    .await?;

    let donors = sqlx::query_as::<_, DonorSummary>(
        "SELECT id, full_name, blood_group, availability_status, last_donation_date, created_at
         FROM donors
         WHERE (?1 IS NULL OR blood_group = ?1)
           AND (?2 IS NULL OR availability_status = ?2)
           AND (?3 IS NULL OR LOWER(full_name) LIKE ?3)
         ORDER BY created_at DESC
         LIMIT ?4 OFFSET ?5",
    )
    .bind(query.blood_group)
    .bind(query.availability)
    .bind(&name_pattern)
    .bind(query.pagination.per_page())
    .bind(query.pagination.offset())
    .fetch_all(&pool)
    .await?;

    Ok(ListDonorsResponse {
        donors,
        pagination: PaginationMetadata::new(
            query.pagination.page(),
            query.pagination.per_page(),
            total,
        ),
    })
}
