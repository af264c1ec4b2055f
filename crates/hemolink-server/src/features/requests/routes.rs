//! HTTP routes for blood requests.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use hemolink_common::types::{BloodGroup, RequestStatus, UrgencyLevel};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::pagination::PaginationParams;
use crate::middleware::Caller;

use super::commands::cancel::{CancelBloodRequest, CancelBloodRequestError};
use super::commands::create::{CreateBloodRequest, CreateBloodRequestError};
use super::commands::decide::{DecideBloodRequest, DecideBloodRequestError, RequestDecision};
use super::commands::purge_expired::{PurgeExpiredRequests, PurgeExpiredRequestsError};
use super::commands::rematch::{RematchBloodRequest, RematchBloodRequestError};
use super::queries::get::{GetBloodRequest, GetBloodRequestError};
use super::queries::list::{ListBloodRequests, ListBloodRequestsError};

/// State for the request routes. Carries the configured retention window
/// so the purge endpoint has a default.
#[derive(Clone)]
pub struct RequestsState {
    pub db: SqlitePool,
    pub retention_days: i64,
}

/// Routes for the request feature, nested under `/api/v1/requests`.
pub fn request_routes() -> Router<RequestsState> {
    Router::new()
        .route("/", post(create_request).get(list_requests))
        .route("/expired", delete(purge_expired_requests))
        .route("/:id", get(get_request))
        .route("/:id/cancel", post(cancel_request))
        .route("/:id/decision", post(decide_request))
        .route("/:id/rematch", post(rematch_request))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    hospital_id: Option<Uuid>,
    blood_group: BloodGroup,
    quantity_units: i64,
    urgency: Option<UrgencyLevel>,
    notes: Option<String>,
}

async fn create_request(
    State(state): State<RequestsState>,
    caller: Caller,
    Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateBloodRequest {
        caller_id: caller.user_id,
        caller_role: caller.role,
        hospital_id: body.hospital_id,
        blood_group: body.blood_group,
        quantity_units: body.quantity_units,
        urgency: body.urgency,
        notes: body.notes,
    };
    let response = super::commands::create::handle(state.db, command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

#[derive(Debug, Deserialize)]
struct ListRequestsParams {
    page: Option<i64>,
    per_page: Option<i64>,
    status: Option<RequestStatus>,
    blood_group: Option<BloodGroup>,
    urgency: Option<UrgencyLevel>,
}

async fn list_requests(
    State(state): State<RequestsState>,
    caller: Caller,
    Query(params): Query<ListRequestsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListBloodRequests {
        caller_id: caller.user_id,
        caller_role: caller.role,
        status: params.status,
        blood_group: params.blood_group,
        urgency: params.urgency,
        pagination: PaginationParams {
            page: params.page,
            per_page: params.per_page,
        },
    };
    let response = super::queries::list::handle(state.db, query).await?;
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.requests, meta)))
}

async fn get_request(
    State(state): State<RequestsState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetBloodRequest {
        request_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let details = super::queries::get::handle(state.db, query).await?;
    Ok(Json(ApiResponse::success(details)))
}

async fn cancel_request(
    State(state): State<RequestsState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CancelBloodRequest {
        request_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let response = super::commands::cancel::handle(state.db, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    decision: RequestDecision,
}

async fn decide_request(
    State(state): State<RequestsState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = DecideBloodRequest {
        request_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        decision: body.decision,
    };
    let response = super::commands::decide::handle(state.db, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn rematch_request(
    State(state): State<RequestsState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let command = RematchBloodRequest {
        request_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let response = super::commands::rematch::handle(state.db, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, Deserialize)]
struct PurgeParams {
    older_than_days: Option<i64>,
}

async fn purge_expired_requests(
    State(state): State<RequestsState>,
    caller: Caller,
    Query(params): Query<PurgeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let command = PurgeExpiredRequests {
        caller_id: caller.user_id,
        caller_role: caller.role,
        older_than_days: params.older_than_days.unwrap_or(state.retention_days),
    };
    let response = super::commands::purge_expired::handle(state.db, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Create(CreateBloodRequestError),
    Cancel(CancelBloodRequestError),
    Decide(DecideBloodRequestError),
    Rematch(RematchBloodRequestError),
    Purge(PurgeExpiredRequestsError),
    Get(GetBloodRequestError),
    List(ListBloodRequestsError),
}

impl From<CreateBloodRequestError> for ApiError {
    fn from(e: CreateBloodRequestError) -> Self {
        Self::Create(e)
    }
}

impl From<CancelBloodRequestError> for ApiError {
    fn from(e: CancelBloodRequestError) -> Self {
        Self::Cancel(e)
    }
}

impl From<DecideBloodRequestError> for ApiError {
    fn from(e: DecideBloodRequestError) -> Self {
        Self::Decide(e)
    }
}

impl From<RematchBloodRequestError> for ApiError {
    fn from(e: RematchBloodRequestError) -> Self {
        Self::Rematch(e)
    }
}

impl From<PurgeExpiredRequestsError> for ApiError {
    fn from(e: PurgeExpiredRequestsError) -> Self {
        Self::Purge(e)
    }
}

impl From<GetBloodRequestError> for ApiError {
    fn from(e: GetBloodRequestError) -> Self {
        Self::Get(e)
    }
}

impl From<ListBloodRequestsError> for ApiError {
    fn from(e: ListBloodRequestsError) -> Self {
        Self::List(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Create(e) => match e {
                CreateBloodRequestError::InvalidQuantity(_)
                | CreateBloodRequestError::InvalidNotes(_)
                | CreateBloodRequestError::MissingHospital => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                CreateBloodRequestError::NotAuthorized
                | CreateBloodRequestError::ForeignHospital => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                CreateBloodRequestError::HospitalNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                CreateBloodRequestError::Database(err) => internal(err),
            },
            ApiError::Cancel(e) => match e {
                CancelBloodRequestError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                CancelBloodRequestError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                CancelBloodRequestError::NotCancellable { .. }
                | CancelBloodRequestError::ConfirmedMatchOutstanding => {
                    (StatusCode::CONFLICT, "INVALID_STATE", e.to_string())
                }
                CancelBloodRequestError::Database(err) => internal(err),
            },
            ApiError::Decide(e) => match e {
                DecideBloodRequestError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                DecideBloodRequestError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                DecideBloodRequestError::NotPending { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE", e.to_string())
                }
                DecideBloodRequestError::Database(err) => internal(err),
            },
            ApiError::Rematch(e) => match e {
                RematchBloodRequestError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                RematchBloodRequestError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                RematchBloodRequestError::NotOpen { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE", e.to_string())
                }
                RematchBloodRequestError::Database(err) => internal(err),
            },
            ApiError::Purge(e) => match e {
                PurgeExpiredRequestsError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                PurgeExpiredRequestsError::InvalidRetention(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                PurgeExpiredRequestsError::Database(err) => internal(err),
            },
            ApiError::Get(e) => match e {
                GetBloodRequestError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                GetBloodRequestError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                GetBloodRequestError::Database(err) => internal(err),
            },
            ApiError::List(e) => match e {
                ListBloodRequestsError::InvalidPagination(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ListBloodRequestsError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                ListBloodRequestsError::Database(err) => internal(err),
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

fn internal(err: sqlx::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "request route database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "an internal error occurred".to_string(),
    )
}
