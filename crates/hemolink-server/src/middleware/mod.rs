//! HTTP middleware: CORS, request tracing and caller identity.

pub mod identity;

use axum::http::header::{
    ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_LANGUAGE, CONTENT_TYPE,
};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::CorsConfig;

pub use identity::Caller;

/// CORS layer for browser clients behind the gateway.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            ACCEPT_LANGUAGE,
            CONTENT_LANGUAGE,
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(identity::USER_ID_HEADER),
            HeaderName::from_static(identity::USER_ROLE_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    if config.allowed_origins.is_empty() {
        // Wildcard origins cannot be combined with credentials.
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer
            .allow_origin(origins)
            .allow_credentials(config.allow_credentials)
    }
}

/// Request/response tracing with latency in the close event.
pub fn tracing_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_with_wildcard_origins() {
        let config = CorsConfig {
            allowed_origins: Vec::new(),
            allow_credentials: false,
        };
        let _layer = cors_layer(&config);
    }

    #[test]
    fn test_cors_layer_with_explicit_origins() {
        let config = CorsConfig {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://app.hemolink.example".to_string(),
            ],
            allow_credentials: true,
        };
        let _layer = cors_layer(&config);
    }

    #[test]
    fn test_tracing_layer_constructs() {
        let _layer = tracing_layer();
    }
}
