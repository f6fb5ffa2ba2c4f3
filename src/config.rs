//! Configuration module for the file vault.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Result, VaultError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty means any origin, without credentials.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Upload root and metadata document configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding every blob and the metadata document.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// File name of the metadata document inside the upload root.
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    /// Maximum decoded upload size in megabytes (MiB).
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Treat an unreadable metadata document as an empty store instead of failing.
    #[serde(default = "default_reset_corrupt_metadata")]
    pub reset_corrupt_metadata: bool,
}

fn default_upload_root() -> String {
    "data/uploads".to_string()
}

fn default_metadata_file() -> String {
    "meta.json".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

fn default_reset_corrupt_metadata() -> bool {
    true
}

impl StorageConfig {
    /// Upload ceiling in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// Full path of the metadata document.
    pub fn metadata_path(&self) -> PathBuf {
        Path::new(&self.upload_root).join(&self.metadata_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            metadata_file: default_metadata_file(),
            max_upload_size_mb: default_max_upload_size(),
            reset_corrupt_metadata: default_reset_corrupt_metadata(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file; empty for console-only output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filevault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEVAULT_UPLOAD_ROOT`: Override the upload root directory
    /// - `FILEVAULT_PORT`: Override the listen port (ignored if not a valid port)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("FILEVAULT_UPLOAD_ROOT") {
            if !root.is_empty() {
                self.storage.upload_root = root;
            }
        }

        if let Ok(port) = std::env::var("FILEVAULT_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) if port.is_empty() => {}
                Err(e) => tracing::warn!("Ignoring FILEVAULT_PORT={}: {}", port, e),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.upload_root.trim().is_empty() {
            return Err(VaultError::Config("storage.upload_root is empty".to_string()));
        }
        if self.storage.metadata_file.trim().is_empty() {
            return Err(VaultError::Config(
                "storage.metadata_file is empty".to_string(),
            ));
        }
        if self.storage.metadata_file.contains(|c: char| c == '/' || c == '\\') {
            return Err(VaultError::Config(
                "storage.metadata_file must be a plain file name".to_string(),
            ));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(VaultError::Config(
                "storage.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
