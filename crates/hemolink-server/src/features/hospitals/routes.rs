//! HTTP routes for the hospital directory.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::pagination::PaginationParams;
use crate::middleware::Caller;

use super::commands::register::{RegisterHospital, RegisterHospitalError};
use super::commands::update::{UpdateHospital, UpdateHospitalError};
use super::queries::get::{GetHospital, GetHospitalError};
use super::queries::list::{ListHospitals, ListHospitalsError};

/// Routes for the hospital feature, nested under `/api/v1/hospitals`.
pub fn hospital_routes() -> Router<SqlitePool> {
    Router::new()
        .route("/", post(register_hospital).get(list_hospitals))
        .route("/:id", get(get_hospital).put(update_hospital))
}

// ============================================================================
// Handlers
// ============================================================================

async fn register_hospital(
    State(pool): State<SqlitePool>,
    Json(command): Json<RegisterHospital>,
) -> Result<impl IntoResponse, ApiError> {
    let response = super::commands::register::handle(pool, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

#[derive(Debug, Deserialize)]
struct ListHospitalsParams {
    page: Option<i64>,
    per_page: Option<i64>,
    city: Option<String>,
    search: Option<String>,
}

async fn list_hospitals(
    State(pool): State<SqlitePool>,
    _caller: Caller,
    Query(params): Query<ListHospitalsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListHospitals {
        pagination: PaginationParams {
            page: params.page,
            per_page: params.per_page,
        },
        city: params.city,
        search: params.search,
    };
    let response = super::queries::list::handle(pool, query).await?;
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.hospitals, meta)))
}

async fn get_hospital(
    State(pool): State<SqlitePool>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let details = super::queries::get::handle(pool, GetHospital { hospital_id: id }).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[derive(Debug, Deserialize)]
struct UpdateHospitalBody {
    name: Option<String>,
    city: Option<String>,
    phone: Option<String>,
}

async fn update_hospital(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateHospitalBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateHospital {
        hospital_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        name: body.name,
        city: body.city,
        phone: body.phone,
    };
    let response = super::commands::update::handle(pool, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Register(RegisterHospitalError),
    Update(UpdateHospitalError),
    Get(GetHospitalError),
    List(ListHospitalsError),
}

impl From<RegisterHospitalError> for ApiError {
    fn from(e: RegisterHospitalError) -> Self {
        Self::Register(e)
    }
}

impl From<UpdateHospitalError> for ApiError {
    fn from(e: UpdateHospitalError) -> Self {
        Self::Update(e)
    }
}

impl From<GetHospitalError> for ApiError {
    fn from(e: GetHospitalError) -> Self {
        Self::Get(e)
    }
}

impl From<ListHospitalsError> for ApiError {
    fn from(e: ListHospitalsError) -> Self {
        Self::List(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Register(e) => match e {
                RegisterHospitalError::InvalidName(_)
                | RegisterHospitalError::InvalidCity(_)
                | RegisterHospitalError::InvalidPhone(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                RegisterHospitalError::Duplicate { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", e.to_string())
                }
                RegisterHospitalError::Database(err) => internal(err),
            },
            ApiError::Update(e) => match e {
                UpdateHospitalError::InvalidName(_)
                | UpdateHospitalError::InvalidCity(_)
                | UpdateHospitalError::InvalidPhone(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                UpdateHospitalError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                UpdateHospitalError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                UpdateHospitalError::Duplicate => {
                    (StatusCode::CONFLICT, "CONFLICT", e.to_string())
                }
                UpdateHospitalError::Database(err) => internal(err),
            },
            ApiError::Get(e) => match e {
                GetHospitalError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                GetHospitalError::Database(err) => internal(err),
            },
            ApiError::List(e) => match e {
                ListHospitalsError::InvalidPagination(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ListHospitalsError::Database(err) => internal(err),
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

fn internal(err: sqlx::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "hospital route database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "an internal error occurred".to_string(),
    )
}
