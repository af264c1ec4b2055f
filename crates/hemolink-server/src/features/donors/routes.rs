//! HTTP routes for the donor registry.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use hemolink_common::types::{AvailabilityStatus, BloodGroup};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::donations::queries::stats::{GetDonorStats, GetDonorStatsError};
use crate::features::shared::pagination::PaginationParams;
use crate::middleware::Caller;

use super::commands::register::{RegisterDonor, RegisterDonorError};
use super::commands::set_availability::{SetDonorAvailability, SetDonorAvailabilityError};
use super::commands::update_profile::{UpdateDonorProfile, UpdateDonorProfileError};
use super::queries::contact::{GetDonorContact, GetDonorContactError};
use super::queries::get::{GetDonor, GetDonorError};
use super::queries::list::{ListDonors, ListDonorsError};

/// Routes for the donor feature, nested under `/api/v1/donors`.
pub fn donor_routes() -> Router<SqlitePool> {
    Router::new()
        .route("/", post(register_donor).get(list_donors))
        .route("/:id", get(get_donor).put(update_donor))
        .route("/:id/availability", put(set_donor_availability))
        .route("/:id/contact", get(get_donor_contact))
        .route("/:id/stats", get(get_donor_stats))
}

// ============================================================================
// Handlers
// ============================================================================

async fn register_donor(
    State(pool): State<SqlitePool>,
    Json(command): Json<RegisterDonor>,
) -> Result<impl IntoResponse, ApiError> {
    let response = super::commands::register::handle(pool, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

#[derive(Debug, Deserialize)]
struct ListDonorsParams {
    page: Option<i64>,
    per_page: Option<i64>,
    blood_group: Option<BloodGroup>,
    availability: Option<AvailabilityStatus>,
    search: Option<String>,
}

async fn list_donors(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Query(params): Query<ListDonorsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListDonors {
        caller_id: caller.user_id,
        caller_role: caller.role,
        pagination: PaginationParams {
            page: params.page,
            per_page: params.per_page,
        },
        blood_group: params.blood_group,
        availability: params.availability,
        search: params.search,
    };
    let response = super::queries::list::handle(pool, query).await?;
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.donors, meta)))
}

async fn get_donor(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetDonor {
        donor_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let details = super::queries::get::handle(pool, query).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[derive(Debug, Deserialize)]
struct UpdateDonorBody {
    full_name: Option<String>,
    phone: Option<String>,
    blood_group: Option<BloodGroup>,
    last_donation_date: Option<NaiveDate>,
}

async fn update_donor(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDonorBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateDonorProfile {
        donor_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        full_name: body.full_name,
        phone: body.phone,
        blood_group: body.blood_group,
        last_donation_date: body.last_donation_date,
    };
    let response = super::commands::update_profile::handle(pool, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, Deserialize)]
struct SetAvailabilityBody {
    availability: AvailabilityStatus,
}

async fn set_donor_availability(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<SetAvailabilityBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = SetDonorAvailability {
        donor_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        availability: body.availability,
    };
    let response = super::commands::set_availability::handle(pool, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_donor_contact(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetDonorContact {
        donor_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let contact = super::queries::contact::handle(pool, query).await?;
    Ok(Json(ApiResponse::success(contact)))
}

async fn get_donor_stats(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetDonorStats {
        donor_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let stats = crate::features::donations::queries::stats::handle(pool, query).await?;
    Ok(Json(ApiResponse::success(stats)))
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Register(RegisterDonorError),
    UpdateProfile(UpdateDonorProfileError),
    SetAvailability(SetDonorAvailabilityError),
    Get(GetDonorError),
    List(ListDonorsError),
    Contact(GetDonorContactError),
    Stats(GetDonorStatsError),
}

impl From<RegisterDonorError> for ApiError {
    fn from(e: RegisterDonorError) -> Self {
        Self::Register(e)
    }
}

impl From<UpdateDonorProfileError> for ApiError {
    fn from(e: UpdateDonorProfileError) -> Self {
        Self::UpdateProfile(e)
    }
}

impl From<SetDonorAvailabilityError> for ApiError {
    fn from(e: SetDonorAvailabilityError) -> Self {
        Self::SetAvailability(e)
    }
}

impl From<GetDonorError> for ApiError {
    fn from(e: GetDonorError) -> Self {
        Self::Get(e)
    }
}

impl From<ListDonorsError> for ApiError {
    fn from(e: ListDonorsError) -> Self {
        Self::List(e)
    }
}

impl From<GetDonorContactError> for ApiError {
    fn from(e: GetDonorContactError) -> Self {
        Self::Contact(e)
    }
}

impl From<GetDonorStatsError> for ApiError {
    fn from(e: GetDonorStatsError) -> Self {
        Self::Stats(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Register(e) => match e {
                RegisterDonorError::InvalidName(_)
                | RegisterDonorError::InvalidEmail(_)
                | RegisterDonorError::InvalidPhone(_)
                | RegisterDonorError::FutureDonationDate(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                RegisterDonorError::DuplicateEmail(_) => {
                    (StatusCode::CONFLICT, "CONFLICT", e.to_string())
                }
                RegisterDonorError::Database(err) => internal(err),
            },
            ApiError::UpdateProfile(e) => match e {
                UpdateDonorProfileError::InvalidName(_)
                | UpdateDonorProfileError::InvalidPhone(_)
                | UpdateDonorProfileError::FutureDonationDate(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                UpdateDonorProfileError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                UpdateDonorProfileError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                UpdateDonorProfileError::Database(err) => internal(err),
            },
            ApiError::SetAvailability(e) => match e {
                SetDonorAvailabilityError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                SetDonorAvailabilityError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                SetDonorAvailabilityError::Database(err) => internal(err),
            },
            ApiError::Get(e) => match e {
                GetDonorError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                GetDonorError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                GetDonorError::Database(err) => internal(err),
            },
            ApiError::List(e) => match e {
                ListDonorsError::InvalidPagination(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ListDonorsError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                ListDonorsError::Database(err) => internal(err),
            },
            ApiError::Contact(e) => match e {
                GetDonorContactError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                GetDonorContactError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                GetDonorContactError::Database(err) => internal(err),
            },
            ApiError::Stats(e) => match e {
                GetDonorStatsError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                GetDonorStatsError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                GetDonorStatsError::Database(err) => internal(err),
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

fn internal(err: sqlx::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "donor route database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "an internal error occurred".to_string(),
    )
}
