//! Shared helpers for driving the full router in integration tests.
//!
//! Tests talk to the application the way a client would: requests go
//! through `tower::ServiceExt::oneshot` against the assembled router, with
//! identity headers standing in for the upstream gateway.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hemolink_server::api;
use hemolink_server::config::Config;
use hemolink_server::db::MIGRATOR;
use hemolink_server::features::FeatureState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

/// Retention window the test app is configured with.
pub const TEST_RETENTION_DAYS: i64 = 30;

/// One migrated in-memory database per test.
///
/// The pool pins a single connection; each `sqlite::memory:` connection
/// is otherwise a database of its own.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    MIGRATOR
        .run(&pool)
        .await
        .expect("failed to run migrations");
    pool
}

/// The assembled application plus a handle on its database.
pub async fn test_app() -> (Router, SqlitePool) {
    let pool = test_pool().await;
    let state = FeatureState {
        db: pool.clone(),
        retention_days: TEST_RETENTION_DAYS,
    };
    let app = api::create_router(state, &Config::default());
    (app, pool)
}

/// Sends one request. `caller` is `(user id, role)` for the identity
/// headers; `None` sends the request anonymously.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<(Uuid, &str)>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header("x-user-id", id.to_string())
            .header("x-user-role", role);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("failed to build request"),
        None => builder.body(Body::empty()).expect("failed to build request"),
    };

    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not JSON")
    };

    (status, json)
}

pub async fn get(
    app: &Router,
    uri: &str,
    caller: Option<(Uuid, &str)>,
) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, caller, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    caller: Option<(Uuid, &str)>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, caller, Some(body)).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    caller: Option<(Uuid, &str)>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, caller, Some(body)).await
}

pub async fn delete(
    app: &Router,
    uri: &str,
    caller: Option<(Uuid, &str)>,
) -> (StatusCode, serde_json::Value) {
    send(app, "DELETE", uri, caller, None).await
}

/// Pulls the id out of a `{ "success": true, "data": { "id": ... } }`
/// envelope.
pub fn data_id(body: &serde_json::Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("response data carried no id")
}
