//! Donor contact lookup.
//!
//! Contact details are shared with a hospital only once a live match links
//! the donor to one of that hospital's requests. Admins are unrestricted.
//! Reading contact details never changes match state.

use hemolink_common::types::Role;
use mediator::Request;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GetDonorContact {
    pub donor_id: Uuid,
    pub caller_id: Uuid,
    pub caller_role: Role,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DonorContact {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Error, Debug)]
pub enum GetDonorContactError {
    #[error("contact details are only shared with matched hospitals and admins")]
    NotAuthorized,

    #[error("donor {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<DonorContact, GetDonorContactError>> for GetDonorContact {}

impl crate::cqrs::middleware::Query for GetDonorContact {}

#[tracing::instrument(skip(pool, query), fields(donor_id = %query.donor_id))]
pub async fn handle(
    pool: SqlitePool,
    query: GetDonorContact,
) -> Result<DonorContact, GetDonorContactError> {
    match query.caller_role {
        Role::Admin => {}
        Role::Hospital => {
            let linked: Option<i64> = sqlx::query_scalar(
                "SELECT 1 FROM donor_matches m
                 JOIN blood_requests r ON r.id = m.request_id
                 WHERE m.donor_id = ?1 AND r.hospital_id = ?2 AND m.status != 'cancelled'
                 LIMIT 1",
            )
            .bind(query.donor_id)
            .bind(query.caller_id)
            .fetch_optional(&pool)
            .await?;
            if linked.is_none() {
                return Err(GetDonorContactError::NotAuthorized);
            }
        }
        Role::Donor => return Err(GetDonorContactError::NotAuthorized),
    }

    sqlx::query_as::<_, DonorContact>(
        "SELECT id, full_name, email, phone FROM donors WHERE id = ?1",
    )
    .bind(query.donor_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetDonorContactError::NotFound(query.donor_id))
}
