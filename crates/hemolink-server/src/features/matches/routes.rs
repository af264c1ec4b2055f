//! HTTP routes for the match lifecycle.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hemolink_common::types::MatchStatus;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::pagination::PaginationParams;
use crate::middleware::Caller;

use super::commands::complete::{CompleteMatch, CompleteMatchError};
use super::commands::transition::{TransitionMatch, TransitionMatchError};
use super::queries::get::{GetMatch, GetMatchError};
use super::queries::list::{ListMatches, ListMatchesError};

/// Routes for the match feature, nested under `/api/v1/matches`.
pub fn match_routes() -> Router<SqlitePool> {
    Router::new()
        .route("/", get(list_matches))
        .route("/:id", get(get_match))
        .route("/:id/transition", post(transition_match))
        .route("/:id/complete", post(complete_match))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListMatchesParams {
    page: Option<i64>,
    per_page: Option<i64>,
    status: Option<MatchStatus>,
}

async fn list_matches(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Query(params): Query<ListMatchesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListMatches {
        caller_id: caller.user_id,
        caller_role: caller.role,
        status: params.status,
        pagination: PaginationParams {
            page: params.page,
            per_page: params.per_page,
        },
    };
    let response = super::queries::list::handle(pool, query).await?;
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.matches, meta)))
}

async fn get_match(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let query = GetMatch {
        match_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
    };
    let details = super::queries::get::handle(pool, query).await?;
    Ok(Json(ApiResponse::success(details)))
}

#[derive(Debug, Deserialize)]
struct TransitionBody {
    status: MatchStatus,
    notes: Option<String>,
}

async fn transition_match(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let command = TransitionMatch {
        match_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        next_status: body.status,
        notes: body.notes,
    };
    let response = super::commands::transition::handle(pool, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[derive(Debug, Deserialize, Default)]
struct CompleteBody {
    notes: Option<String>,
}

async fn complete_match(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let command = CompleteMatch {
        match_id: id,
        caller_id: caller.user_id,
        caller_role: caller.role,
        notes: body.notes,
    };
    let response = super::commands::complete::handle(pool, command).await?;
    Ok(Json(ApiResponse::success(response)))
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Transition(TransitionMatchError),
    Complete(CompleteMatchError),
    Get(GetMatchError),
    List(ListMatchesError),
}

impl From<TransitionMatchError> for ApiError {
    fn from(e: TransitionMatchError) -> Self {
        Self::Transition(e)
    }
}

impl From<CompleteMatchError> for ApiError {
    fn from(e: CompleteMatchError) -> Self {
        Self::Complete(e)
    }
}

impl From<GetMatchError> for ApiError {
    fn from(e: GetMatchError) -> Self {
        Self::Get(e)
    }
}

impl From<ListMatchesError> for ApiError {
    fn from(e: ListMatchesError) -> Self {
        Self::List(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Transition(e) => match e {
                TransitionMatchError::CompletionViaTransition
                | TransitionMatchError::InvalidNotes(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                TransitionMatchError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                TransitionMatchError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                TransitionMatchError::InvalidTransition { from, to } => {
                    // Clients get the rejected pair in machine-readable form.
                    let body = ErrorResponse::new("INVALID_STATE", e.to_string())
                        .with_details(json!({ "from": from, "to": to }));
                    return (StatusCode::CONFLICT, Json(body)).into_response();
                }
                TransitionMatchError::Database(err) => internal(err),
            },
            ApiError::Complete(e) => match e {
                CompleteMatchError::InvalidNotes(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                CompleteMatchError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
                }
                CompleteMatchError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                CompleteMatchError::NotConfirmed { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE", e.to_string())
                }
                CompleteMatchError::Database(err) => internal(err),
            },
            ApiError::Get(e) => match e {
                GetMatchError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                GetMatchError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                GetMatchError::Database(err) => internal(err),
            },
            ApiError::List(e) => match e {
                ListMatchesError::InvalidPagination(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ListMatchesError::Database(err) => internal(err),
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

fn internal(err: sqlx::Error) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "match route database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "an internal error occurred".to_string(),
    )
}
