//! Request DTOs for Web API.

use serde::Deserialize;

/// Query parameters carrying the caller-asserted viewer identity.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerQuery {
    /// Viewer identity, used when the `X-Viewer-Id` header is absent or empty.
    #[serde(default)]
    pub viewer_id: Option<String>,
}
