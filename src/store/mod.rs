//! Durable record of the last successfully downloaded URL.
//!
//! Stored as a small JSON document next to the app's other local data. There
//! is exactly one record; every successful fetch overwrites it.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access download record: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode download record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    #[serde(default)]
    pub last_downloaded_url: String,
    #[serde(default)]
    pub downloaded_at: u64,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record. A missing file is an empty record.
    pub async fn load(&self) -> Result<DownloadRecord, StoreError> {
        parse_record(tokio::fs::read_to_string(&self.path).await)
    }

    /// Same as [`load`](Self::load) for callers outside the runtime's async
    /// context, such as the synchronous cache check in `request_download`.
    pub fn load_blocking(&self) -> Result<DownloadRecord, StoreError> {
        parse_record(std::fs::read_to_string(&self.path))
    }

    /// The last downloaded URL, or empty when nothing usable is recorded.
    pub async fn last_downloaded_url(&self) -> String {
        self.url_or_empty(self.load().await)
    }

    pub fn last_downloaded_url_blocking(&self) -> String {
        self.url_or_empty(self.load_blocking())
    }

    fn url_or_empty(&self, record: Result<DownloadRecord, StoreError>) -> String {
        match record {
            Ok(record) => record.last_downloaded_url,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable download record");
                String::new()
            }
        }
    }

    /// Replaces the record and writes it through to disk before returning.
    pub async fn save_last_downloaded_url(&self, url: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let record = DownloadRecord {
            last_downloaded_url: url.to_string(),
            downloaded_at: crate::utils::get_timestamp(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        // Write beside the target then rename so readers never see half a record.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn parse_record(content: io::Result<String>) -> Result<DownloadRecord, StoreError> {
    match content {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DownloadRecord::default()),
        Err(e) => Err(e.into()),
    }
}
