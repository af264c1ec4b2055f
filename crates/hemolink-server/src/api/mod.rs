//! HTTP surface: router assembly, health endpoints and serving.

pub mod response;

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sqlx::SqlitePool;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;
use response::{ApiResponse, ErrorResponse};

/// Assemble the full application router.
///
/// Exposed for integration tests, which drive the router directly via
/// `tower::ServiceExt` without binding a socket.
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(state.db.clone());

    Router::new()
        .route("/", get(root))
        .merge(health_routes)
        .nest("/api/v1", features::router(state))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Bind and serve until interrupted.
pub async fn serve(config: Config, pool: SqlitePool) -> anyhow::Result<()> {
    let state = FeatureState {
        db: pool,
        retention_days: config.retention.fulfilled_request_days,
    };
    let shutdown_timeout = config.server.shutdown_timeout_secs;
    let app = create_router(state, &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "hemolink server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received sigterm, shutting down"),
    }

    // Short drain window so in-flight requests can finish.
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}

async fn root() -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "service": "hemolink-server",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

async fn health(State(pool): State<SqlitePool>) -> impl IntoResponse {
    match crate::db::health_check(&pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "status": "ok",
                "database": "reachable",
            }))),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("UNAVAILABLE", "database unreachable")),
            )
                .into_response()
        }
    }
}
