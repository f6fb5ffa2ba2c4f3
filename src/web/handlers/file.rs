//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{AccessSummary, UploadRequest, DEFAULT_MIME};
use crate::web::dto::{FileListResponse, UploadResponse, ViewerQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the caller-asserted viewer identity.
pub const VIEWER_HEADER: &str = "x-viewer-id";

/// Resolve the viewer identity: non-empty header first, then the query
/// parameter, then the empty string.
///
/// Header bytes are decoded as UTF-8, lossily, so non-ASCII ids still win
/// over the query parameter.
fn resolve_viewer(headers: &HeaderMap, query: &ViewerQuery) -> String {
    let from_header = headers
        .get(VIEWER_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty());

    match from_header {
        Some(viewer) => viewer,
        None => query.viewer_id.clone().unwrap_or_default(),
    }
}

/// Content-Disposition value naming the original file, percent-encoded.
///
/// Percent-encoding leaves no quotes or control characters in the value.
fn content_disposition_header(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"",
        urlencoding::encode(filename)
    )
}

/// POST /api/files - Upload a file.
///
/// Request body: JSON with `name`, `ownerId`, `access`, base64 `data` and
/// optional `mime`, `sharedWith`, `note`.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::file_too_large(state.vault.max_upload_size())
        } else {
            ApiError::bad_request(format!("Invalid upload body: {}", e.body_text()))
        }
    })?;

    let receipt = state.vault.upload(request)?;

    Ok((StatusCode::CREATED, Json(UploadResponse::new(receipt.file_id))))
}

/// GET /api/files/:id - Download a file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Query(query): Query<ViewerQuery>,
    headers: HeaderMap,
) -> Result<Response<Body>, ApiError> {
    let viewer = resolve_viewer(&headers, &query);

    let download = state.vault.download(&file_id, &viewer)?;
    let record = download.record;

    let content_type = HeaderValue::from_str(&record.mime).unwrap_or_else(|_| {
        tracing::warn!(file_id = %file_id, mime = %record.mime, "Unusable stored MIME type");
        HeaderValue::from_static(DEFAULT_MIME)
    });

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files - List the files the viewer may download.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
    headers: HeaderMap,
) -> Result<Json<FileListResponse>, ApiError> {
    let viewer = resolve_viewer(&headers, &query);
    let files = state.vault.list_visible(&viewer)?;

    Ok(Json(FileListResponse { files }))
}

/// GET /api/summary - Count stored files per access level.
pub async fn access_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccessSummary>, ApiError> {
    Ok(Json(state.vault.access_summary()?))
}
