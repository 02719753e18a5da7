use std::path::PathBuf;

/// A URL to fetch. Two requests are the same request when their URLs match
/// ignoring case, with Unicode case folding applied to the whole string.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn matches(&self, recorded_url: &str) -> bool {
        !recorded_url.is_empty() && same_url(&self.url, recorded_url)
    }
}

fn same_url(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

impl PartialEq for DownloadRequest {
    fn eq(&self, other: &Self) -> bool {
        same_url(&self.url, &other.url)
    }
}

impl Eq for DownloadRequest {}

/// Bytes written so far for the active fetch. `total` is `None` when the
/// server did not report a content length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl ProgressState {
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some(self.downloaded as f32 / total as f32),
            _ => None,
        }
    }
}

/// Handle to the destination file handed to completion observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Downloading,
    Inspecting,
    Viewing,
    Completed,
    Failed,
}
