//! # Storage layer
//!
//! Three interchangeable backends behind [`StorageBackend`]:
//!
//! | Backend | Type | Selected when |
//! |---|---|---|
//! | SQL (sqlite) | [`UrlRepository`] | `DATABASE_DSN` is set |
//! | File | [`FileRepository`] | `FILE_STORAGE_PATH` is set |
//! | Memory | [`MemoryRepository`] | neither |
//!
//! [`open`] makes the choice once at startup and hands back a shared trait
//! object.

mod file;
mod memory;
mod repository;
mod sql;

pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use repository::StorageBackend;
pub use sql::UrlRepository;

use std::{path::Path, str::FromStr, sync::Arc, time::Duration};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use tracing::info;

use crate::config::{Config, StorageKind};
use crate::error::Result;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Build the backend the configuration selects.
///
/// The SQL backend is connected and migrated before it is returned.
///
/// # Errors
/// Connection, migration or file-open failures.
pub async fn open(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    let storage: Arc<dyn StorageBackend> = match config.storage_kind() {
        StorageKind::Database(dsn) => {
            let db = Database::connect(&dsn).await?;
            db.migrate().await?;
            Arc::new(UrlRepository::new(db))
        }
        StorageKind::File(path) => Arc::new(FileRepository::open(path).await?),
        StorageKind::Memory => Arc::new(MemoryRepository::new()),
    };

    info!(backend = storage.kind(), "Storage backend ready");
    Ok(storage)
}

// =====================================
// Database Connection
// =====================================
/// Connection pool of the SQL backend. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    /// Connect to `database_url` (e.g. `sqlite://data/urls.db`).
    ///
    /// The database file and its directory are created when missing. An
    /// in-memory URL gets a single long-lived connection, since every
    /// sqlite connection would otherwise see its own empty database.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(database_url: impl AsRef<str>) -> Result<Self> {
        let url = database_url.as_ref();

        if is_in_memory(url) {
            return Self::single_connection(url).await;
        }

        if let Some(path) = url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(options)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Fresh, migrated in-memory database.
    ///
    /// # Errors
    /// Returns an error if the connection or the migrations fail.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::single_connection("sqlite::memory:").await?;
        db.migrate().await?;
        Ok(db)
    }

    async fn single_connection(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&*self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }

    /// Start a transaction; it rolls back on drop unless committed.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>> {
        Ok(self.pool.begin().await?)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file?mode=memory"));
        assert!(!is_in_memory("sqlite://data/urls.db"));
    }

    #[tokio::test]
    async fn test_open_selects_backend() {
        let dir = TempDir::new().unwrap();

        let config = ConfigBuilder::new().file_storage_path("").build();
        assert_eq!(open(&config).await.unwrap().kind(), "memory");

        let path = dir.path().join("urls.json");
        let config = ConfigBuilder::new()
            .file_storage_path(path.to_string_lossy())
            .build();
        assert_eq!(open(&config).await.unwrap().kind(), "file");

        let config = ConfigBuilder::new().database_dsn("sqlite::memory:").build();
        assert_eq!(open(&config).await.unwrap().kind(), "sqlite");
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("urls.db");
        let url = format!("sqlite://{}", path.display());

        let db = Database::connect(&url).await.unwrap();
        db.migrate().await.unwrap();
        db.health_check().await.unwrap();

        assert!(path.exists());
    }
}
