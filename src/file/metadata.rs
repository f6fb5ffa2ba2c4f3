//! Stored-file records and the JSON metadata store.
//!
//! The whole store is one JSON object keyed by file identifier. Every call
//! reads the document from disk and every mutation rewrites it in full. A
//! process-wide lock is held across each load-modify-save so that concurrent
//! uploads are serialized instead of overwriting each other.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::access::AccessLevel;
use crate::{Result, VaultError};

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileRecord {
    /// Server-generated identifier.
    pub id: String,
    /// On-disk filename (identifier + original extension).
    pub stored_name: String,
    /// Display name supplied by the uploader.
    pub original_name: String,
    /// MIME type served on download.
    pub mime: String,
    /// Size of the decoded payload in bytes.
    pub size: u64,
    /// Caller-asserted owner identity.
    pub owner_id: String,
    /// Access level.
    pub access: AccessLevel,
    /// Identities allowed in addition to the owner when access is team.
    #[serde(default)]
    pub shared_with: BTreeSet<String>,
    /// Freeform note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

type Records = BTreeMap<String, StoredFileRecord>;

/// The document as read from disk.
struct Document {
    records: Records,
    /// The on-disk document was unreadable and has been replaced by an empty store.
    recovered: bool,
}

/// Flat-file metadata store.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    reset_corrupt: bool,
    lock: Mutex<()>,
}

impl MetadataStore {
    /// Create a store backed by the document at `path`.
    ///
    /// Nothing touches the disk until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reset_corrupt: true,
            lock: Mutex::new(()),
        }
    }

    /// Choose whether an unreadable document is treated as an empty store
    /// (the default) or reported as `VaultError::Metadata`.
    pub fn with_reset_corrupt(mut self, reset_corrupt: bool) -> Self {
        self.reset_corrupt = reset_corrupt;
        self
    }

    /// Path of the metadata document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a record by identifier.
    pub fn get(&self, id: &str) -> Result<Option<StoredFileRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut doc = self.read_document()?;
        Ok(doc.records.remove(id))
    }

    /// List every record, in identifier order.
    pub fn list(&self) -> Result<Vec<StoredFileRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let doc = self.read_document()?;
        Ok(doc.records.into_values().collect())
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_document()?.records.len())
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Insert a new record and persist the whole store.
    ///
    /// Identifiers are never reused; inserting an existing identifier fails.
    pub fn insert(&self, record: StoredFileRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut doc = self.read_document()?;

        if doc.records.contains_key(&record.id) {
            return Err(VaultError::Metadata(format!(
                "identifier {} is already in use",
                record.id
            )));
        }

        if doc.recovered {
            self.preserve_unreadable_document();
        }

        doc.records.insert(record.id.clone(), record);
        self.write_document(&doc.records)
    }

    fn read_document(&self) -> Result<Document> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Document {
                    records: Records::new(),
                    recovered: false,
                })
            }
            Err(e) => return self.recover(VaultError::Io(e)),
        };

        match serde_json::from_str::<Records>(&raw) {
            Ok(records) => Ok(Document {
                records,
                recovered: false,
            }),
            Err(e) => self.recover(e.into()),
        }
    }

    fn recover(&self, err: VaultError) -> Result<Document> {
        if !self.reset_corrupt {
            tracing::error!(path = %self.path.display(), "Unreadable metadata document: {}", err);
            return Err(VaultError::Metadata(format!(
                "unreadable metadata document {}: {err}",
                self.path.display()
            )));
        }

        tracing::warn!(
            path = %self.path.display(),
            "Unreadable metadata document, treating store as empty: {}",
            err
        );
        Ok(Document {
            records: Records::new(),
            recovered: true,
        })
    }

    /// Move an unreadable document aside before it gets overwritten.
    fn preserve_unreadable_document(&self) {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));

        match fs::rename(&self.path, &backup) {
            Ok(()) => tracing::warn!(
                backup = %Path::new(&backup).display(),
                "Preserved unreadable metadata document"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to preserve unreadable metadata document: {}", e),
        }
    }

    fn write_document(&self, records: &Records) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
