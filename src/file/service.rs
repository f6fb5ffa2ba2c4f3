//! File service for the vault.
//!
//! This module composes blob storage, the metadata store and the access
//! predicate into the upload, download and listing flows.

use std::collections::BTreeSet;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::access::{can_access, check_access, AccessLevel};
use super::metadata::{MetadataStore, StoredFileRecord};
use super::storage::FileStorage;
use super::{DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_MIME};
use crate::config::StorageConfig;
use crate::{Result, VaultError};

/// Standard alphabet, padding optional, non-zero trailing bits ignored.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Upload request as sent by clients.
///
/// Every field is optional at the type level so that missing fields are
/// reported as `VaultError::InvalidRequest` rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Display name, also the source of the stored extension.
    pub name: Option<String>,
    /// MIME type.
    pub mime: Option<String>,
    /// Owner identity.
    pub owner_id: Option<String>,
    /// Access level (`owner`, `team` or `link`).
    pub access: Option<String>,
    /// Identities the file is shared with.
    pub shared_with: Option<Vec<String>>,
    /// Freeform note.
    pub note: Option<String>,
    /// Base64-encoded payload.
    pub data: Option<String>,
}

impl UploadRequest {
    /// Create a new upload request with the required fields.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        access: AccessLevel,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            owner_id: Some(owner_id.into()),
            access: Some(access.as_str().to_string()),
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// Set the MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Set the shared-with identities.
    pub fn with_shared_with<I, S>(mut self, shared_with: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_with = Some(shared_with.into_iter().map(Into::into).collect());
        self
    }

    /// Set the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub name: String,
    pub mime: String,
    pub owner_id: String,
    pub access: AccessLevel,
    pub shared_with: BTreeSet<String>,
    pub note: Option<String>,
    pub content: Vec<u8>,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Identifier assigned to the file.
    pub file_id: String,
    /// The record written to the metadata store.
    pub record: StoredFileRecord,
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub record: StoredFileRecord,
    /// File content.
    pub content: Vec<u8>,
}

/// Number of stored files per access level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    pub owner: usize,
    pub team: usize,
    pub link: usize,
    pub total: usize,
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

/// Validate an upload request and decode its payload.
///
/// Checks run in order: required fields, access level, payload decoding,
/// empty payload, size ceiling.
pub fn validate_upload(request: UploadRequest, max_size: u64) -> Result<ValidatedUpload> {
    let name = required(request.name);
    let data = required(request.data);
    let owner_id = required(request.owner_id);
    let access = required(request.access);

    let (name, data, owner_id, access) = match (name, data, owner_id, access) {
        (Some(name), Some(data), Some(owner_id), Some(access)) => (name, data, owner_id, access),
        (name, data, owner_id, access) => {
            let missing: Vec<&str> = [
                ("name", name.is_none()),
                ("data", data.is_none()),
                ("ownerId", owner_id.is_none()),
                ("access", access.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, is_missing)| is_missing.then_some(field))
            .collect();
            return Err(VaultError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
    };

    let access: AccessLevel = access.parse()?;

    let content = decode_payload(&data)?;
    if content.is_empty() {
        return Err(VaultError::InvalidRequest("file is empty".to_string()));
    }

    let size = content.len() as u64;
    if size > max_size {
        return Err(VaultError::PayloadTooLarge {
            size,
            limit: max_size,
        });
    }

    Ok(ValidatedUpload {
        name,
        mime: required(request.mime).unwrap_or_else(|| DEFAULT_MIME.to_string()),
        owner_id,
        access,
        shared_with: request.shared_with.unwrap_or_default().into_iter().collect(),
        note: request.note,
        content,
    })
}

/// Decode a base64 payload, ignoring ASCII whitespace.
///
/// URL-safe `-` and `_` are accepted in place of `+` and `/`, also mixed
/// within one payload.
fn decode_payload(data: &str) -> Result<Vec<u8>> {
    let compact: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    PAYLOAD_ENGINE
        .decode(compact)
        .map_err(|e| VaultError::InvalidRequest(format!("data is not valid base64: {e}")))
}

/// File service for managing uploads and downloads.
#[derive(Debug)]
pub struct VaultService {
    storage: FileStorage,
    metadata: MetadataStore,
    max_upload_size: u64,
}

impl VaultService {
    /// Create a new VaultService.
    pub fn new(storage: FileStorage, metadata: MetadataStore) -> Self {
        Self {
            storage,
            metadata,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }

    /// Build the service from storage configuration, creating the upload root.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let storage = FileStorage::new(&config.upload_root)?;
        let metadata = MetadataStore::new(config.metadata_path())
            .with_reset_corrupt(config.reset_corrupt_metadata);

        Ok(Self::new(storage, metadata).with_max_upload_size(config.max_upload_bytes()))
    }

    /// Set the decoded upload ceiling in bytes.
    pub fn with_max_upload_size(mut self, max_size: u64) -> Self {
        self.max_upload_size = max_size;
        self
    }

    /// Decoded upload ceiling in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Blob storage.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Metadata store.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Upload a file.
    ///
    /// The blob is written before the metadata record. If the metadata write
    /// fails the blob stays behind as an orphan; nothing is rolled back.
    pub fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let upload = validate_upload(request, self.max_upload_size)?;

        let file_id = Uuid::new_v4().to_string();
        let stored_name = FileStorage::stored_name_for(&file_id, &upload.name);

        self.storage.save_with_name(&upload.content, &stored_name)?;

        let record = StoredFileRecord {
            id: file_id.clone(),
            stored_name,
            original_name: upload.name,
            mime: upload.mime,
            size: upload.content.len() as u64,
            owner_id: upload.owner_id,
            access: upload.access,
            shared_with: upload.shared_with,
            note: upload.note,
            uploaded_at: Utc::now(),
        };

        if let Err(e) = self.metadata.insert(record.clone()) {
            tracing::error!(
                file_id = %file_id,
                stored_name = %record.stored_name,
                "Blob written but metadata insert failed: {}",
                e
            );
            return Err(e);
        }

        tracing::info!(
            file_id = %file_id,
            size = record.size,
            access = %record.access,
            "Stored upload"
        );

        Ok(UploadReceipt { file_id, record })
    }

    /// Download a file as `viewer`.
    ///
    /// Fails with `NotFound` for an unknown identifier, `Forbidden` when the
    /// access predicate denies the viewer, and `NotFound` again when the
    /// record exists but its blob is gone.
    pub fn download(&self, file_id: &str, viewer: &str) -> Result<DownloadResult> {
        let record = self
            .metadata
            .get(file_id)?
            .ok_or_else(|| VaultError::NotFound("file metadata".to_string()))?;

        check_access(&record, viewer)?;

        let content = self.storage.load(&record.stored_name).map_err(|e| match e {
            VaultError::NotFound(_) => {
                tracing::warn!(file_id = %file_id, "Metadata exists but blob is missing");
                VaultError::NotFound("stored file".to_string())
            }
            other => other,
        })?;

        Ok(DownloadResult { record, content })
    }

    /// List the files `viewer` may download, newest first.
    pub fn list_visible(&self, viewer: &str) -> Result<Vec<StoredFileRecord>> {
        let mut records: Vec<_> = self
            .metadata
            .list()?
            .into_iter()
            .filter(|record| can_access(record, viewer))
            .collect();

        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// Count stored files per access level.
    pub fn access_summary(&self) -> Result<AccessSummary> {
        let mut summary = AccessSummary::default();
        for record in self.metadata.list()? {
            match record.access {
                AccessLevel::Owner => summary.owner += 1,
                AccessLevel::Team => summary.team += 1,
                AccessLevel::Link => summary.link += 1,
            }
            summary.total += 1;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn setup_service() -> (TempDir, VaultService) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let metadata = MetadataStore::new(temp_dir.path().join("meta.json"));
        (temp_dir, VaultService::new(storage, metadata))
    }

    fn team_upload() -> UploadRequest {
        UploadRequest::new("a.txt", "u1", AccessLevel::Team, encode(b"hello"))
            .with_shared_with(["u2"])
    }

    #[test]
    fn test_validate_missing_fields() {
        let result = validate_upload(UploadRequest::default(), 10);
        match result {
            Err(VaultError::InvalidRequest(msg)) => {
                assert!(msg.contains("name"));
                assert!(msg.contains("data"));
                assert!(msg.contains("ownerId"));
                assert!(msg.contains("access"));
            }
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }

        let mut request = team_upload();
        request.owner_id = Some(String::new());
        match validate_upload(request, 10) {
            Err(VaultError::InvalidRequest(msg)) => {
                assert_eq!(msg, "missing required fields: ownerId");
            }
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_unknown_access_level() {
        let mut request = team_upload();
        request.access = Some("public".to_string());

        assert!(matches!(
            validate_upload(request, 10),
            Err(VaultError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_invalid_base64() {
        let request = UploadRequest::new("a.txt", "u1", AccessLevel::Owner, "***not base64***");

        assert!(matches!(
            validate_upload(request, 10),
            Err(VaultError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_empty_payload() {
        // Decodes to zero bytes
        let request = UploadRequest::new("a.txt", "u1", AccessLevel::Owner, "  \n");

        assert!(matches!(
            validate_upload(request, 10),
            Err(VaultError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_decoding_is_lenient() {
        let unpadded = UploadRequest::new("a.txt", "u1", AccessLevel::Owner, "aGVsbG8");
        assert_eq!(validate_upload(unpadded, 10).unwrap().content, b"hello");

        let wrapped = UploadRequest::new("a.txt", "u1", AccessLevel::Owner, "aGVs\r\nbG8=");
        assert_eq!(validate_upload(wrapped, 10).unwrap().content, b"hello");
    }

    #[test]
    fn test_validate_accepts_url_safe_alphabet() {
        let url_safe = UploadRequest::new("a.bin", "u1", AccessLevel::Link, "Pz8-");
        assert_eq!(validate_upload(url_safe, 10).unwrap().content, b"??>");

        let underscore = UploadRequest::new("a.bin", "u1", AccessLevel::Link, "__8=");
        assert_eq!(validate_upload(underscore, 10).unwrap().content, [0xffu8, 0xff]);

        let mixed = UploadRequest::new("a.bin", "u1", AccessLevel::Link, "+_-/");
        assert_eq!(
            validate_upload(mixed, 10).unwrap().content,
            base64::engine::general_purpose::STANDARD.decode("+/+/").unwrap()
        );
    }

    #[test]
    fn test_validate_allows_trailing_bits() {
        // "bG9" sets bits past the last whole byte; canonical form is "bG8"
        let request = UploadRequest::new("a.txt", "u1", AccessLevel::Owner, "aGVsbG9=");
        assert_eq!(validate_upload(request, 10).unwrap().content, b"hello");
    }

    #[test]
    fn test_validate_size_boundary() {
        let exact = UploadRequest::new("a.bin", "u1", AccessLevel::Link, encode(&[7u8; 10]));
        assert_eq!(validate_upload(exact, 10).unwrap().content.len(), 10);

        let over = UploadRequest::new("a.bin", "u1", AccessLevel::Link, encode(&[7u8; 11]));
        assert!(matches!(
            validate_upload(over, 10),
            Err(VaultError::PayloadTooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_validate_default_ceiling_boundary() {
        let exact = vec![0u8; DEFAULT_MAX_UPLOAD_SIZE as usize];
        let request = UploadRequest::new("big.bin", "u1", AccessLevel::Owner, encode(&exact));
        assert!(validate_upload(request, DEFAULT_MAX_UPLOAD_SIZE).is_ok());

        let over = vec![0u8; DEFAULT_MAX_UPLOAD_SIZE as usize + 1];
        let request = UploadRequest::new("big.bin", "u1", AccessLevel::Owner, encode(&over));
        assert!(matches!(
            validate_upload(request, DEFAULT_MAX_UPLOAD_SIZE),
            Err(VaultError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_defaults() {
        let mut request = team_upload();
        request.shared_with = None;
        request.mime = Some(String::new());

        let upload = validate_upload(request, 10).unwrap();

        assert_eq!(upload.mime, DEFAULT_MIME);
        assert!(upload.shared_with.is_empty());
        assert!(upload.note.is_none());
    }

    #[test]
    fn test_upload_writes_blob_and_record() {
        let (temp_dir, service) = setup_service();

        let receipt = service
            .upload(team_upload().with_mime("text/plain").with_note("draft"))
            .unwrap();
        let record = &receipt.record;

        assert_eq!(record.id, receipt.file_id);
        assert_eq!(record.stored_name, format!("{}.txt", receipt.file_id));
        assert_eq!(record.original_name, "a.txt");
        assert_eq!(record.mime, "text/plain");
        assert_eq!(record.size, 5);
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.access, AccessLevel::Team);
        assert!(record.shared_with.contains("u2"));
        assert_eq!(record.note.as_deref(), Some("draft"));

        let blob = fs::read(temp_dir.path().join(&record.stored_name)).unwrap();
        assert_eq!(blob, b"hello");
        assert_eq!(
            fs::metadata(service.storage().get_file_path(&record.stored_name))
                .unwrap()
                .len(),
            record.size
        );

        assert_eq!(service.metadata().get(&receipt.file_id).unwrap().as_ref(), Some(record));
    }

    #[test]
    fn test_upload_without_extension() {
        let (_temp_dir, service) = setup_service();

        let request = UploadRequest::new("Makefile", "u1", AccessLevel::Owner, encode(b"all:"));
        let receipt = service.upload(request).unwrap();

        assert_eq!(receipt.record.stored_name, receipt.file_id);
    }

    #[test]
    fn test_upload_identifiers_are_unique() {
        let (_temp_dir, service) = setup_service();

        let ids: BTreeSet<String> = (0..20)
            .map(|_| service.upload(team_upload()).unwrap().file_id)
            .collect();

        assert_eq!(ids.len(), 20);
        assert_eq!(service.metadata().len().unwrap(), 20);
    }

    #[test]
    fn test_upload_rejected_writes_nothing() {
        let (temp_dir, service) = setup_service();
        let service = service.with_max_upload_size(4);

        let result = service.upload(team_upload());

        assert!(matches!(result, Err(VaultError::PayloadTooLarge { .. })));
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_round_trip() {
        let (_temp_dir, service) = setup_service();
        let content: Vec<u8> = (0..=255).collect();

        let request = UploadRequest::new("bytes.bin", "u1", AccessLevel::Owner, encode(&content));
        let receipt = service.upload(request).unwrap();

        let download = service.download(&receipt.file_id, "u1").unwrap();
        assert_eq!(download.content, content);
        assert_eq!(download.record.mime, DEFAULT_MIME);
    }

    #[test]
    fn test_download_team_scenario() {
        let (_temp_dir, service) = setup_service();
        let receipt = service.upload(team_upload()).unwrap();

        assert_eq!(service.download(&receipt.file_id, "u2").unwrap().content, b"hello");
        assert_eq!(service.download(&receipt.file_id, "u1").unwrap().content, b"hello");
        assert!(matches!(
            service.download(&receipt.file_id, "u3"),
            Err(VaultError::Forbidden(_))
        ));
    }

    #[test]
    fn test_download_unknown_identifier() {
        let (_temp_dir, service) = setup_service();

        assert!(matches!(
            service.download("never-uploaded", "u1"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_download_missing_blob() {
        let (temp_dir, service) = setup_service();
        let receipt = service.upload(team_upload()).unwrap();

        fs::remove_file(temp_dir.path().join(&receipt.record.stored_name)).unwrap();

        match service.download(&receipt.file_id, "u1") {
            Err(VaultError::NotFound(what)) => assert_eq!(what, "stored file"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_download_denied_before_blob_check() {
        let (temp_dir, service) = setup_service();
        let receipt = service.upload(team_upload()).unwrap();

        fs::remove_file(temp_dir.path().join(&receipt.record.stored_name)).unwrap();

        assert!(matches!(
            service.download(&receipt.file_id, "u3"),
            Err(VaultError::Forbidden(_))
        ));
    }

    #[test]
    fn test_list_visible_and_summary() {
        let (_temp_dir, service) = setup_service();

        service
            .upload(UploadRequest::new("mine.txt", "u1", AccessLevel::Owner, encode(b"1")))
            .unwrap();
        service.upload(team_upload()).unwrap();
        service
            .upload(UploadRequest::new("pub.txt", "u9", AccessLevel::Link, encode(b"3")))
            .unwrap();

        let names = |viewer: &str| -> BTreeSet<String> {
            service
                .list_visible(viewer)
                .unwrap()
                .into_iter()
                .map(|r| r.original_name)
                .collect()
        };

        assert_eq!(names("u1").len(), 3);
        assert_eq!(
            names("u2"),
            ["a.txt", "pub.txt"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert_eq!(
            names(""),
            ["pub.txt".to_string()].into_iter().collect::<BTreeSet<String>>()
        );

        let summary = service.access_summary().unwrap();
        assert_eq!(
            summary,
            AccessSummary {
                owner: 1,
                team: 1,
                link: 1,
                total: 3
            }
        );
    }

    #[test]
    fn test_list_visible_newest_first() {
        let (_temp_dir, service) = setup_service();

        let first = service.upload(team_upload()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = service.upload(team_upload()).unwrap();

        let listed: Vec<String> = service
            .list_visible("u1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(listed, vec![second.file_id, first.file_id]);
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            upload_root: temp_dir.path().join("uploads").to_string_lossy().into_owned(),
            max_upload_size_mb: 2,
            ..Default::default()
        };

        let service = VaultService::from_config(&config).unwrap();

        assert!(temp_dir.path().join("uploads").is_dir());
        assert_eq!(service.max_upload_size(), 2 * 1024 * 1024);
        assert_eq!(
            service.metadata().path(),
            temp_dir.path().join("uploads").join("meta.json")
        );
    }
}
