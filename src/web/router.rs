//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{access_summary, download_file, list_files, upload_file, AppState};
use super::middleware::create_cors_layer;

/// Slack on top of the base64-expanded payload for the rest of the JSON body.
const JSON_OVERHEAD_BYTES: usize = 64 * 1024;

/// HTTP body limit for an upload whose decoded payload may reach `max_upload_size`.
///
/// Sized so that oversized payloads reach the service and get a proper 413
/// body instead of being cut off by the transport.
pub fn upload_body_limit(max_upload_size: u64) -> usize {
    let decoded = usize::try_from(max_upload_size).unwrap_or(usize::MAX);
    decoded
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(JSON_OVERHEAD_BYTES)
}

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // Leave room for a payload one byte over the ceiling
    let body_limit = upload_body_limit(app_state.vault.max_upload_size().saturating_add(1));

    Router::new()
        .route("/api/files", post(upload_file).get(list_files))
        .route("/api/files/:id", get(download_file))
        .route("/api/summary", get(access_summary))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
