//! Response DTOs for Web API.

use serde::Serialize;

use crate::file::StoredFileRecord;

/// Message returned with every successful upload.
pub const UPLOAD_MESSAGE: &str = "Stored under a generated identifier; metadata recorded.";

/// Upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Identifier assigned to the uploaded file.
    pub file_id: String,
    /// Confirmation message.
    pub message: String,
}

impl UploadResponse {
    /// Create a new upload response for `file_id`.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            message: UPLOAD_MESSAGE.to_string(),
        }
    }
}

/// File list response.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    /// Files visible to the viewer, newest first.
    pub files: Vec<StoredFileRecord>,
}
