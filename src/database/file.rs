//! # File backend
//!
//! Append-only JSON lines. Every write appends; nothing is rewritten in
//! place. A soft delete appends a new version of the record with
//! `is_deleted: true`, and readers fold the file by `uuid` so the last line
//! for an id is the current state. Tombstoned lines are never compacted.
//!
//! ```text
//! {"uuid":1,"user_id":"u","short_url":"20381BAK","original_url":"https://example.com","is_deleted":false}
//! {"uuid":1,"user_id":"u","short_url":"20381BAK","original_url":"https://example.com","is_deleted":true}
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::{debug, error, warn};

use super::repository::{
    check_batch, deletable, find_by_code, find_live_by_original, into_lookup, StorageBackend,
};
use crate::error::{AppError, Result};
use crate::models::{NewUrl, Saved, UrlRecord};

/// Storage in a single append-only file.
///
/// The lock guards the last assigned id and serializes all file access.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    last_id: Mutex<i64>,
}

impl FileRepository {
    /// Open (creating if needed) the file at `path` and recover the id sequence.
    ///
    /// # Errors
    /// I/O failures, or a line that is not a valid record.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let contents = fs::read(&path).await?;
        let (records, intact_len) = parse_records(&contents)?;
        if intact_len < contents.len() {
            warn!(
                path = %path.display(),
                discarded = contents.len() - intact_len,
                "Truncating torn trailing line"
            );
            OpenOptions::new()
                .write(true)
                .open(&path)
                .await?
                .set_len(intact_len as u64)
                .await?;
        }

        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);

        debug!(path = %path.display(), last_id, "Opened file storage");

        Ok(Self {
            path,
            last_id: Mutex::new(last_id),
        })
    }

    /// Append `records` as one write. On failure the file is cut back to its
    /// previous length so no partial batch stays visible.
    async fn append(&self, records: &[UrlRecord]) -> Result<()> {
        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let len = file.metadata().await?.len();

        if let Err(e) = write_flushed(&mut file, buf.as_bytes()).await {
            error!(path = %self.path.display(), error = %e, "Append failed, rolling back");
            file.set_len(len).await?;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read_records(&self) -> Result<Vec<UrlRecord>> {
        let contents = fs::read(&self.path).await?;
        Ok(parse_records(&contents)?.0)
    }
}

async fn write_flushed(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// Fold the file by id, keeping the last version of each record.
///
/// Every complete line ends in a newline; a trailing fragment without one is
/// the remains of an interrupted append and is left out. Also returns the
/// byte length of the complete lines.
fn parse_records(contents: &[u8]) -> Result<(Vec<UrlRecord>, usize)> {
    let intact_len = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let mut by_id = BTreeMap::new();

    for line in contents[..intact_len].split(|&b| b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record: UrlRecord = serde_json::from_slice(line)?;
        by_id.insert(record.id, record);
    }

    Ok((by_id.into_values().collect(), intact_len))
}

#[async_trait]
impl StorageBackend for FileRepository {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn ping(&self) -> Result<()> {
        Err(AppError::unsupported(self.kind(), "ping"))
    }

    async fn save(&self, record: &NewUrl) -> Result<Saved> {
        let mut last_id = self.last_id.lock().await;
        let records = self.read_records().await?;

        if let Some(existing) = find_live_by_original(&records, &record.original_url) {
            return Ok(Saved::AlreadyExists(existing.short_code.clone()));
        }

        let stored = UrlRecord::from_new(*last_id + 1, record);
        self.append(std::slice::from_ref(&stored)).await?;
        *last_id = stored.id;

        Ok(Saved::Created(stored.short_code))
    }

    async fn save_all(&self, records: &[NewUrl]) -> Result<()> {
        let mut last_id = self.last_id.lock().await;
        let existing = self.read_records().await?;

        check_batch(&existing, records)?;

        let stored: Vec<UrlRecord> = records
            .iter()
            .zip(*last_id + 1..)
            .map(|(new, id)| UrlRecord::from_new(id, new))
            .collect();
        self.append(&stored).await?;
        *last_id += stored.len() as i64;

        Ok(())
    }

    async fn get(&self, short_code: &str) -> Result<UrlRecord> {
        let _guard = self.last_id.lock().await;
        let records = self.read_records().await?;

        into_lookup(find_by_code(&records, short_code), short_code)
    }

    async fn get_by_id(&self, id: i64) -> Result<UrlRecord> {
        let _guard = self.last_id.lock().await;
        let found = self.read_records()
            .await?
            .into_iter()
            .find(|r| r.id == id);

        into_lookup(found, id)
    }

    async fn get_all_by_user(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        let _guard = self.last_id.lock().await;

        Ok(self.read_records()
            .await?
            .into_iter()
            .filter(|r| r.is_live() && r.user_id == user_id)
            .collect())
    }

    async fn delete_batch(&self, user_id: &str, short_codes: &[String]) -> Result<()> {
        if short_codes.is_empty() {
            return Ok(());
        }

        let _guard = self.last_id.lock().await;
        let mut records = self.read_records().await?;

        let tombstones: Vec<UrlRecord> = deletable(&mut records, user_id, short_codes)
            .map(|record| {
                record.is_deleted = true;
                record.clone()
            })
            .collect();

        if tombstones.is_empty() {
            return Ok(());
        }
        self.append(&tombstones).await
    }
}
