//! # SQL backend
//!
//! `UrlRepository` stores records in the `urls` table. Duplicate detection
//! is left to the partial unique index on live `original_url`s; the
//! violation is caught and translated into the `AlreadyExists` outcome.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use super::repository::{into_lookup, StorageBackend};
use super::Database;
use crate::error::{AppError, Result};
use crate::models::{NewUrl, Saved, UrlRecord};

const INSERT_URL: &str = "INSERT INTO urls (user_id, short_url, original_url) VALUES (?, ?, ?)";

const SELECT_URL: &str = "SELECT uuid, user_id, short_url, original_url, is_deleted FROM urls";

/// A unique violation whose live row is gone by the time it is read back
/// gets one more insert.
const SAVE_ATTEMPTS: usize = 2;

/// Bound parameters per `IN (...)` list, under SQLite's variable limit.
const MAX_CODES_PER_STATEMENT: usize = 500;

/// Repository over the connection pool.
#[derive(Debug, Clone)]
pub struct UrlRepository {
    db: Database,
}

impl UrlRepository {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Code of the live record for `original_url`, if there still is one.
    async fn live_code(&self, original_url: &str) -> Result<Option<String>> {
        let code = sqlx::query_scalar::<_, String>(
            "SELECT short_url FROM urls WHERE original_url = ? AND is_deleted = 0",
        )
        .bind(original_url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(code)
    }

    async fn insert(&self, record: &NewUrl) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(INSERT_URL)
            .bind(&record.user_id)
            .bind(&record.short_code)
            .bind(&record.original_url)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl StorageBackend for UrlRepository {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<()> {
        self.db.health_check().await
    }

    async fn save(&self, record: &NewUrl) -> Result<Saved> {
        for _ in 0..SAVE_ATTEMPTS {
            match self.insert(record).await {
                Ok(()) => return Ok(Saved::Created(record.short_code.clone())),
                Err(err) if is_unique_violation(&err) => {
                    if let Some(code) = self.live_code(&record.original_url).await? {
                        return Ok(Saved::AlreadyExists(code));
                    }
                    debug!(
                        original_url = %record.original_url,
                        "Live record deleted meanwhile, retrying insert"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(format!(
            "URL '{}' is being modified concurrently",
            record.original_url
        )))
    }

    async fn save_all(&self, records: &[NewUrl]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        // sqlx caches the prepared INSERT per connection, so the whole batch
        // runs through one statement inside one transaction.
        for record in records {
            let result = sqlx::query(INSERT_URL)
                .bind(&record.user_id)
                .bind(&record.short_code)
                .bind(&record.original_url)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    // Dropping `tx` rolls the batch back.
                    return Err(AppError::Conflict(format!(
                        "URL '{}' already exists",
                        record.original_url
                    )));
                }
                Err(err) => return Err(err.into()),
            }
        }

        tx.commit().await?;
        debug!(count = records.len(), "Batch committed");

        Ok(())
    }

    async fn get(&self, short_code: &str) -> Result<UrlRecord> {
        let found = sqlx::query_as::<_, UrlRecord>(&format!(
            "{} WHERE short_url = ? ORDER BY is_deleted ASC, uuid DESC LIMIT 1",
            SELECT_URL
        ))
        .bind(short_code)
        .fetch_optional(self.db.pool())
        .await?;

        into_lookup(found, short_code)
    }

    async fn get_by_id(&self, id: i64) -> Result<UrlRecord> {
        let found = sqlx::query_as::<_, UrlRecord>(&format!("{} WHERE uuid = ?", SELECT_URL))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        into_lookup(found, id)
    }

    async fn get_all_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        let urls = sqlx::query_as::<_, UrlRecord>(&format!(
            "{} WHERE user_id = ? AND is_deleted = 0 ORDER BY uuid",
            SELECT_URL
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(urls)
    }

    async fn delete_batch(&self, user_id: &str, short_codes: &[String]) -> Result<()> {
        for chunk in short_codes.chunks(MAX_CODES_PER_STATEMENT) {
            let mut query = QueryBuilder::<Sqlite>::new(
                "UPDATE urls SET is_deleted = 1 WHERE is_deleted = 0 AND user_id = ",
            );
            query.push_bind(user_id);
            query.push(" AND short_url IN (");
            let mut codes = query.separated(", ");
            for code in chunk {
                codes.push_bind(code);
            }
            codes.push_unseparated(")");

            let result = query.build().execute(self.db.pool()).await?;
            debug!(user_id, affected = result.rows_affected(), "Soft-deleted URLs");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unique_violation_maps_to_existing_code() {
        let repo = UrlRepository::new(Database::in_memory().await.unwrap());
        let new = NewUrl::new("u1", "https://example.com");

        assert_eq!(
            repo.save(&new).await.unwrap(),
            Saved::Created("20381BAK".to_string())
        );
        assert_eq!(
            repo.save(&NewUrl::new("u2", "https://example.com")).await.unwrap(),
            Saved::AlreadyExists("20381BAK".to_string())
        );
    }

    #[tokio::test]
    async fn test_ping_succeeds() {
        let repo = UrlRepository::new(Database::in_memory().await.unwrap());
        assert!(repo.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_live_code_ignores_tombstones() {
        let repo = UrlRepository::new(Database::in_memory().await.unwrap());
        repo.save(&NewUrl::new("u", "https://example.com")).await.unwrap();
        assert_eq!(
            repo.live_code("https://example.com").await.unwrap(),
            Some("20381BAK".to_string())
        );

        repo.delete_batch("u", &["20381BAK".to_string()]).await.unwrap();
        assert_eq!(repo.live_code("https://example.com").await.unwrap(), None);

        // With no live row left the insert goes through again.
        assert_eq!(
            repo.save(&NewUrl::new("u", "https://example.com")).await.unwrap(),
            Saved::Created("20381BAK".to_string())
        );
    }
}
