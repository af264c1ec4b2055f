//! HTTP routes for the donation ledger.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::shared::pagination::PaginationParams;
use crate::middleware::Caller;

use super::queries::list::{ListDonations, ListDonationsError};

/// Routes for the donation feature, nested under `/api/v1/donations`.
///
/// Writes never come through here: ledger entries are appended by match
/// completion. Per-donor statistics live under `/donors/:id/stats`.
pub fn donation_routes() -> Router<SqlitePool> {
    Router::new().route("/", get(list_donations))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListDonationsParams {
    page: Option<i64>,
    per_page: Option<i64>,
    donor_id: Option<Uuid>,
    hospital_id: Option<Uuid>,
}

async fn list_donations(
    State(pool): State<SqlitePool>,
    caller: Caller,
    Query(params): Query<ListDonationsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = ListDonations {
        caller_id: caller.user_id,
        caller_role: caller.role,
        donor_id: params.donor_id,
        hospital_id: params.hospital_id,
        pagination: PaginationParams {
            page: params.page,
            per_page: params.per_page,
        },
    };
    let response = super::queries::list::handle(pool, query).await?;
    let meta = json!({ "pagination": response.pagination });
    Ok(Json(ApiResponse::success_with_meta(response.donations, meta)))
}

// ============================================================================
// Error mapping
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    List(ListDonationsError),
}

impl From<ListDonationsError> for ApiError {
    fn from(e: ListDonationsError) -> Self {
        Self::List(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::List(e) => match e {
                ListDonationsError::InvalidPagination(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ListDonationsError::NotAuthorized => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                ListDonationsError::Database(err) => {
                    tracing::error!(error = %err, "donation route database error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "an internal error occurred".to_string(),
                    )
                }
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
