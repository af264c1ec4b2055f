//! Feature slices.
//!
//! Each feature is a vertical slice owning its commands, queries and
//! routes:
//!
//! - `donors`: donor registry, availability and contact sharing
//! - `hospitals`: hospital directory
//! - `requests`: blood requests and their lifecycle
//! - `matches`: donor matching and the match lifecycle
//! - `donations`: append-only donation history and statistics

pub mod donations;
pub mod donors;
pub mod hospitals;
pub mod matches;
pub mod requests;
pub mod shared;

use axum::Router;
use sqlx::SqlitePool;

/// State shared by all feature routers.
#[derive(Clone)]
pub struct FeatureState {
    pub db: SqlitePool,
    /// Fulfilled requests older than this are eligible for cleanup.
    pub retention_days: i64,
}

/// Assemble all feature routers under one tree.
pub fn router(state: FeatureState) -> Router {
    let requests_state = requests::routes::RequestsState {
        db: state.db.clone(),
        retention_days: state.retention_days,
    };

    Router::new()
        .nest("/donors", donors::donor_routes().with_state(state.db.clone()))
        .nest(
            "/hospitals",
            hospitals::hospital_routes().with_state(state.db.clone()),
        )
        .nest(
            "/requests",
            requests::request_routes().with_state(requests_state),
        )
        .nest("/matches", matches::match_routes().with_state(state.db.clone()))
        .nest(
            "/donations",
            donations::donation_routes().with_state(state.db),
        )
}
