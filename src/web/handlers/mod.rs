//! API handlers for the vault.

pub mod file;

pub use file::*;

use std::sync::Arc;

use crate::file::VaultService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upload/download service.
    pub vault: Arc<VaultService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(vault: VaultService) -> Self {
        Self {
            vault: Arc::new(vault),
        }
    }
}
