//! # Configuration
//!
//! Settings come from command-line flags, each falling back to an
//! environment variable (optionally seeded from a `.env` file by `main`)
//! and then to a default, so the service starts with no configuration at
//! all, backed by the file storage under `tmp/`.
//!
//! | Flag | Variable | Default |
//! |---|---|---|
//! | `-a` | `SERVER_ADDRESS` | `localhost:8080` |
//! | `-b` | `BASE_URL` | `localhost:8080` |
//! | `-l` | `LOG_LEVEL` | `info` |
//! | `-f` | `FILE_STORAGE_PATH` | `tmp/short-url-db.json` |
//! | `-d` | `DATABASE_DSN` | empty |
//! | `--secret-key` | `SECRET_KEY` | `change-me-in-production` |
//! | `--token-expiration-hours` | `TOKEN_EXPIRATION_HOURS` | `24` |
//! | `--delete-batch-size` | `DELETE_BATCH_SIZE` | `20` |
//! | `--delete-flush-interval-ms` | `DELETE_FLUSH_INTERVAL_MS` | `1000` |
//! | `--delete-queue-capacity` | `DELETE_QUEUE_CAPACITY` | `10` |
//! | `--environment` | `ENVIRONMENT` | `development` |

mod cli;

pub use cli::{Cli, Environment};

use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const DEFAULT_ADDRESS: &str = "localhost:8080";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FILE_STORAGE_PATH: &str = "tmp/short-url-db.json";
const DEFAULT_SECRET: &str = "change-me-in-production";

/// Application settings.
///
/// # Example
/// ```rust
/// use shortener::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.base_url, "localhost:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `host:port` the HTTP server binds to
    pub server_address: String,

    /// Base address composed into short URLs, with or without a scheme
    pub base_url: String,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Path of the append-only JSON lines file
    pub file_storage_path: String,

    /// sqlx connection string; wins over the file path when non-empty
    pub database_dsn: String,

    /// HMAC key for owner tokens
    pub secret_key: String,

    pub token_expiration_hours: u64,

    pub deletion: DeletionSettings,

    pub environment: Environment,
}

/// Tuning of the background deletion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSettings {
    /// Pending codes per owner that trigger an immediate flush
    pub batch_size: usize,

    /// Period of the flush-everything tick
    pub flush_interval: Duration,

    /// Unconsumed requests the queue holds before producers wait
    pub queue_capacity: usize,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            flush_interval: Duration::from_secs(1),
            queue_capacity: 10,
        }
    }
}

/// Which storage backend the configuration selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Database(String),
    File(String),
    Memory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_ADDRESS.to_string(),
            base_url: DEFAULT_ADDRESS.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            file_storage_path: DEFAULT_FILE_STORAGE_PATH.to_string(),
            database_dsn: String::new(),
            secret_key: DEFAULT_SECRET.to_string(),
            token_expiration_hours: 24,
            deletion: DeletionSettings::default(),
            environment: Environment::Development,
        }
    }
}

impl Config {
    /// Settings from the process arguments and environment.
    ///
    /// Prints usage and exits on `--help` or on a malformed flag.
    ///
    /// # Errors
    /// Returns `AppError::Config` when the resulting settings are invalid.
    pub fn load() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    /// # Errors
    /// Returns `AppError::Config` when the settings are invalid.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self::from(cli);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.server_address.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => {}
            _ => {
                return Err(AppError::Config(format!(
                    "invalid server address: {}",
                    self.server_address
                )))
            }
        }

        if !self.base_url.contains(':') {
            return Err(AppError::Config(format!(
                "invalid base address, expected host:port or a URL: {}",
                self.base_url
            )));
        }

        if self.deletion.batch_size == 0
            || self.deletion.queue_capacity == 0
            || self.deletion.flush_interval.is_zero()
        {
            return Err(AppError::Config(
                "deletion batch size, queue capacity and flush interval must be positive"
                    .to_string(),
            ));
        }

        if self.environment.is_production() && self.secret_key == DEFAULT_SECRET {
            return Err(AppError::Config(
                "SECRET_KEY must be changed in production".to_string(),
            ));
        }

        Ok(())
    }

    /// Storage backend selected by these settings: database, then file, then memory.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        if !self.database_dsn.trim().is_empty() {
            StorageKind::Database(self.database_dsn.clone())
        } else if !self.file_storage_path.trim().is_empty() {
            StorageKind::File(self.file_storage_path.clone())
        } else {
            StorageKind::Memory
        }
    }

    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_expiration_hours as i64)
    }
}

// =====================================
// Builder Pattern
// =====================================
/// Builds a `Config` starting from the defaults.
///
/// ```rust
/// use shortener::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .base_url("http://short.test")
///     .file_storage_path("")
///     .build();
/// assert_eq!(config.base_url, "http://short.test");
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    #[must_use]
    pub fn server_address(mut self, addr: impl Into<String>) -> Self {
        self.config.server_address = addr.into();
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    #[must_use]
    pub fn file_storage_path(mut self, path: impl Into<String>) -> Self {
        self.config.file_storage_path = path.into();
        self
    }

    #[must_use]
    pub fn database_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.config.database_dsn = dsn.into();
        self
    }

    #[must_use]
    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.config.secret_key = secret.into();
        self
    }

    #[must_use]
    pub fn deletion(mut self, settings: DeletionSettings) -> Self {
        self.config.deletion = settings;
        self
    }

    #[must_use]
    pub fn environment(mut self, env: Environment) -> Self {
        self.config.environment = env;
        self
    }

    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }

}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_address, "localhost:8080");
        assert_eq!(config.deletion.batch_size, 20);
        assert_eq!(config.deletion.queue_capacity, 10);
        assert_eq!(config.deletion.flush_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_selection_order() {
        let config = ConfigBuilder::new()
            .database_dsn("sqlite::memory:")
            .file_storage_path("tmp/db.json")
            .build();
        assert_eq!(
            config.storage_kind(),
            StorageKind::Database("sqlite::memory:".to_string())
        );

        let config = ConfigBuilder::new().file_storage_path("tmp/db.json").build();
        assert_eq!(config.storage_kind(), StorageKind::File("tmp/db.json".to_string()));

        let config = ConfigBuilder::new().file_storage_path("").build();
        assert_eq!(config.storage_kind(), StorageKind::Memory);
    }

    #[test]
    fn test_invalid_server_address() {
        let config = ConfigBuilder::new().server_address("localhost").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = ConfigBuilder::new()
            .deletion(DeletionSettings {
                batch_size: 0,
                ..DeletionSettings::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_needs_port_or_scheme() {
        let config = ConfigBuilder::new().base_url("localhost").build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().base_url("https://sho.rt").build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_cli_validates() {
        let cli = Cli::try_parse_from(["shortener", "-a", "localhost"]).unwrap();
        assert!(matches!(Config::from_cli(cli), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validation_fails_in_production_with_default_secret() {
        let config = ConfigBuilder::new()
            .environment(Environment::Production)
            .build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new()
            .environment(Environment::Production)
            .secret_key("rotated")
            .build();
        assert!(config.validate().is_ok());
    }
}
