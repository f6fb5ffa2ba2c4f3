//! CORS middleware configuration.

use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::web::handlers::VIEWER_HEADER;

const METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Any origin, no credentials.
fn permissive() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(METHODS)
        .allow_headers(Any)
        .allow_origin(Any)
        .expose_headers([CONTENT_DISPOSITION, CONTENT_LENGTH])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect()
}

/// Create a CORS layer from the configured origins.
///
/// Browsers read the download filename from `Content-Disposition`, so that
/// header is always exposed.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = parse_origins(origins);
    if allowed.is_empty() {
        return permissive();
    }

    CorsLayer::new()
        .allow_methods(METHODS)
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(VIEWER_HEADER),
        ])
        .expose_headers([CONTENT_DISPOSITION, CONTENT_LENGTH])
        .allow_credentials(true)
        .allow_origin(allowed)
}
