//! Configuration module for Burrow.

use serde::Deserialize;
use std::path::Path;

use crate::file::DEFAULT_MAX_FILE_SIZE;
use crate::{BurrowError, Result};

/// Environment variable overriding the JWT secret.
pub const ENV_JWT_SECRET: &str = "BURROW_JWT_SECRET";

/// Environment variable overriding the maximum upload size in bytes.
pub const ENV_MAX_FILE_BYTE_SIZE: &str = "BURROW_MAX_FILE_BYTE_SIZE";

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Shared secret used to verify bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/burrow.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Root directory of the blob store.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum size of a single uploaded file in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

fn default_storage_path() -> String {
    "data/blobs".to_string()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file. Logs go to stdout only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(BurrowError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BurrowError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `BURROW_JWT_SECRET`: Override the JWT secret key
    /// - `BURROW_MAX_FILE_BYTE_SIZE`: Override the maximum upload size in bytes
    ///
    /// Invalid values are logged and skipped, so call this after logging is
    /// initialized. Returns the names of the skipped variables.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<&'static str> {
        let mut ignored = Vec::new();

        if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            self.web.jwt_secret = secret;
        }

        if let Some(raw) = lookup(ENV_MAX_FILE_BYTE_SIZE).filter(|s| !s.is_empty()) {
            match raw.trim().parse::<u64>() {
                Ok(size) => self.files.max_file_size_bytes = size,
                Err(e) => {
                    tracing::warn!(
                        value = %raw,
                        error = %e,
                        "Ignoring invalid {}",
                        ENV_MAX_FILE_BYTE_SIZE
                    );
                    ignored.push(ENV_MAX_FILE_BYTE_SIZE);
                }
            }
        }

        ignored
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The JWT secret is not set
    /// - The maximum file size is zero
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(BurrowError::Config(format!(
                "web.jwt_secret must be set (or provide {ENV_JWT_SECRET})"
            )));
        }
        if self.files.max_file_size_bytes == 0 {
            return Err(BurrowError::Config(
                "files.max_file_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
