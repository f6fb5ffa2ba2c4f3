//! Access levels and the download access predicate.
//!
//! Viewer identities are caller-asserted strings compared by exact equality.
//! Nothing here verifies who the caller really is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::metadata::StoredFileRecord;
use crate::{Result, VaultError};

/// Who may download a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Only the owner.
    Owner,
    /// The owner and every identity in `sharedWith`.
    Team,
    /// Anyone who knows the identifier.
    Link,
}

impl AccessLevel {
    /// Wire name of the access level.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Owner => "owner",
            AccessLevel::Team => "team",
            AccessLevel::Link => "link",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(AccessLevel::Owner),
            "team" => Ok(AccessLevel::Team),
            "link" => Ok(AccessLevel::Link),
            other => Err(VaultError::InvalidRequest(format!(
                "access must be one of owner, team, link (got {other:?})"
            ))),
        }
    }
}

/// Check whether `viewer` may download the file described by `record`.
pub fn can_access(record: &StoredFileRecord, viewer: &str) -> bool {
    match record.access {
        AccessLevel::Owner => record.owner_id == viewer,
        AccessLevel::Team => record.owner_id == viewer || record.shared_with.contains(viewer),
        AccessLevel::Link => true,
    }
}

/// Like [`can_access`], but returns `VaultError::Forbidden` on denial.
pub fn check_access(record: &StoredFileRecord, viewer: &str) -> Result<()> {
    if can_access(record, viewer) {
        return Ok(());
    }

    let reason = match record.access {
        AccessLevel::Owner => "only the owner may download this file",
        _ => "only the owner or shared members may download this file",
    };
    Err(VaultError::Forbidden(reason.to_string()))
}
