//! File vault module.
//!
//! This module provides the access-controlled upload/download core:
//! - Blob storage named by server-generated identifiers
//! - Flat JSON metadata store
//! - Owner / team / link access predicate

pub mod access;
mod metadata;
mod service;
mod storage;

pub use access::{can_access, check_access, AccessLevel};
pub use metadata::{MetadataStore, StoredFileRecord};
pub use service::{
    validate_upload, AccessSummary, DownloadResult, UploadReceipt, UploadRequest,
    ValidatedUpload, VaultService,
};
pub use storage::FileStorage;

/// Default maximum decoded upload size (50 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// MIME type used when the uploader supplies none.
pub const DEFAULT_MIME: &str = "application/octet-stream";
