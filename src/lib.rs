//! filevault - access-controlled file vault
//!
//! Stores uploaded files under generated identifiers, records their metadata
//! in a flat JSON document and gates downloads by an owner / team / link
//! access policy.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{Result, VaultError};
pub use file::{
    can_access, AccessLevel, FileStorage, MetadataStore, StoredFileRecord, UploadRequest,
    VaultService,
};
pub use web::WebServer;
