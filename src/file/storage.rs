//! Blob storage for the vault.
//!
//! Blobs live flat inside the upload root, one file per upload:
//! ```text
//! {upload_root}/
//! ├── 3f2b8c1e-7d4a-4b6e-9c1f-0a2b3c4d5e6f.txt
//! ├── 9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d.png
//! └── meta.json
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Result, VaultError};

/// File storage service for managing blobs on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Upload root directory.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under the given stored name.
    ///
    /// The upload root is recreated if it vanished since startup.
    pub fn save_with_name(&self, content: &[u8], stored_name: &str) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::write(self.get_file_path(stored_name), content)?;
        Ok(())
    }

    /// Load a blob's content.
    ///
    /// Returns `VaultError::NotFound` if the blob is missing on disk.
    pub fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let file_path = self.get_file_path(stored_name);

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("stored blob {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the full file path for a stored name.
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    /// Build the on-disk name for a file identifier and the uploader's display name.
    pub fn stored_name_for(file_id: &str, original_name: &str) -> String {
        format!("{file_id}{}", Self::extract_extension(original_name))
    }

    /// Extract the extension of a display name, leading dot included.
    ///
    /// Only the final path component is considered. Returns an empty string
    /// when there is no dot, or when the only dot starts the name (`.hidden`).
    fn extract_extension(filename: &str) -> &str {
        let base = filename
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(filename);

        if base == ".." {
            return "";
        }

        match base.rfind('.') {
            None | Some(0) => "",
            Some(idx) => &base[idx..],
        }
    }
}
