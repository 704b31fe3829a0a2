//! Router assembly.
//!
//! Layers, outermost first: Sentry, HTTP trace span, request ID, security
//! headers, session, route guard.

use std::path::Path;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    SiteSessionStore, create_session_layer, request_id_middleware, route_guard,
    security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Static asset directory, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/site/static";

/// Build the full application router.
///
/// `static_dir` is served under `/static`.
pub fn router(state: AppState, store: SiteSessionStore, static_dir: impl AsRef<Path>) -> Router {
    let session_layer = create_session_layer(store, state.config());
    let rate_limit = state.config().rate_limit;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(rate_limit))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(axum::middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// 503 until the auth provider has resolved its first session state.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.auth().is_loading() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
