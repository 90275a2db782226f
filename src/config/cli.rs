use clap::{Parser, ValueEnum};

use super::{
    Config, DeletionSettings, DEFAULT_ADDRESS, DEFAULT_FILE_STORAGE_PATH, DEFAULT_LOG_LEVEL,
    DEFAULT_SECRET,
};

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
pub const TOKEN_EXPIRATION_HOURS_ENV: &str = "TOKEN_EXPIRATION_HOURS";
pub const DELETE_BATCH_SIZE_ENV: &str = "DELETE_BATCH_SIZE";
pub const DELETE_FLUSH_INTERVAL_MS_ENV: &str = "DELETE_FLUSH_INTERVAL_MS";
pub const DELETE_QUEUE_CAPACITY_ENV: &str = "DELETE_QUEUE_CAPACITY";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";

/// Deployment environment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    #[value(alias = "prod")]
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Command-line flags. Each one falls back to its environment variable,
/// then to the default; a flag given explicitly wins over the variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "shortener", version, about = "URL shortener")]
pub struct Cli {
    /// HTTP server address (host:port)
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV, default_value = DEFAULT_ADDRESS)]
    pub server_address: String,

    /// Base address of short URLs
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_ADDRESS)]
    pub base_url: String,

    #[arg(short = 'l', long, env = LOG_LEVEL_ENV, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// File storage path; empty selects the in-memory backend
    #[arg(
        short = 'f',
        long,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH
    )]
    pub file_storage_path: String,

    /// Database connection string; selects the SQL backend
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(long, env = SECRET_KEY_ENV, default_value = DEFAULT_SECRET, hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = TOKEN_EXPIRATION_HOURS_ENV, default_value_t = 24)]
    pub token_expiration_hours: u64,

    #[arg(long, env = DELETE_BATCH_SIZE_ENV, default_value_t = 20)]
    pub delete_batch_size: usize,

    #[arg(long, env = DELETE_FLUSH_INTERVAL_MS_ENV, default_value_t = 1000)]
    pub delete_flush_interval_ms: u64,

    #[arg(long, env = DELETE_QUEUE_CAPACITY_ENV, default_value_t = 10)]
    pub delete_queue_capacity: usize,

    #[arg(
        long,
        env = ENVIRONMENT_ENV,
        value_enum,
        ignore_case = true,
        default_value = "development"
    )]
    pub environment: Environment,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            server_address: cli.server_address,
            base_url: cli.base_url,
            log_level: cli.log_level,
            file_storage_path: cli.file_storage_path,
            database_dsn: cli.database_dsn.unwrap_or_default(),
            secret_key: cli.secret_key,
            token_expiration_hours: cli.token_expiration_hours,
            deletion: DeletionSettings {
                batch_size: cli.delete_batch_size,
                flush_interval: std::time::Duration::from_millis(cli.delete_flush_interval_ms),
                queue_capacity: cli.delete_queue_capacity,
            },
            environment: cli.environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "shortener",
            "-a",
            "0.0.0.0:9000",
            "-b",
            "https://sho.rt:443",
            "-l",
            "debug",
            "-f",
            "",
            "-d",
            "sqlite::memory:",
        ])
        .unwrap();

        let config = Config::from(cli);
        assert_eq!(config.server_address, "0.0.0.0:9000");
        assert_eq!(config.base_url, "https://sho.rt:443");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.file_storage_path, "");
        assert_eq!(config.database_dsn, "sqlite::memory:");
    }

    #[test]
    fn test_long_flags_for_deletion_tuning() {
        let cli = Cli::try_parse_from([
            "shortener",
            "--delete-batch-size",
            "5",
            "--delete-flush-interval-ms",
            "250",
            "--environment",
            "PROD",
        ])
        .unwrap();

        let config = Config::from(cli);
        assert_eq!(config.deletion.batch_size, 5);
        assert_eq!(config.deletion.flush_interval, Duration::from_millis(250));
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_non_numeric_batch_size_is_rejected() {
        assert!(Cli::try_parse_from(["shortener", "--delete-batch-size", "many"]).is_err());
    }
}
