//! Caller identity extraction.
//!
//! Authentication happens at the gateway, which forwards the verified
//! caller as two headers: `x-user-id` (the donor or hospital row id, or an
//! admin id) and `x-user-role`. Handlers receive the pair as a [`Caller`]
//! and enforce authorization themselves; a missing or malformed pair is
//! rejected before the handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hemolink_common::types::Role;
use uuid::Uuid;

use crate::api::response::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Verified caller identity forwarded by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

/// Rejection for requests without a usable identity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRejection {
    MissingHeader(&'static str),
    MalformedHeader(&'static str),
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let message = match self {
            IdentityRejection::MissingHeader(header) => {
                format!("missing required header '{header}'")
            }
            IdentityRejection::MalformedHeader(header) => {
                format!("malformed value in header '{header}'")
            }
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("UNAUTHORIZED", message)),
        )
            .into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_str(parts, USER_ID_HEADER)?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| IdentityRejection::MalformedHeader(USER_ID_HEADER))?;

        let role = header_str(parts, USER_ROLE_HEADER)?;
        let role = role
            .parse::<Role>()
            .map_err(|_| IdentityRejection::MalformedHeader(USER_ROLE_HEADER))?;

        Ok(Caller { user_id, role })
    }
}

fn header_str<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, IdentityRejection> {
    parts
        .headers
        .get(name)
        .ok_or(IdentityRejection::MissingHeader(name))?
        .to_str()
        .map_err(|_| IdentityRejection::MalformedHeader(name))
}
