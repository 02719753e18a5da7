use std::env;
use std::path::PathBuf;

use tracing::Level;

pub const DEFAULT_PANORAMA_URL: &str =
    "https://dl.dropboxusercontent.com/s/ow6tpp8marvo0f8/pano1.jpg?dl=0";
pub const DEFAULT_FILE_NAME: &str = "panorama.jpg";
pub const DEFAULT_CHUNK_SIZE: usize = 512;
const STATE_FILE_NAME: &str = "FileDownloader.json";
const APP_DIR: &str = "panorama-display";

/// Runtime configuration for the downloader and the viewer window.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// URL requested when the window opens.
    pub panorama_url: String,
    pub pictures_dir: PathBuf,
    pub file_name: String,
    /// JSON file holding the last downloaded URL.
    pub state_path: PathBuf,
    pub chunk_size: usize,
    pub log_level: Level,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let pictures_dir = dirs::picture_dir().unwrap_or_else(|| data_dir.clone());

        Self {
            panorama_url: DEFAULT_PANORAMA_URL.to_string(),
            pictures_dir,
            file_name: DEFAULT_FILE_NAME.to_string(),
            state_path: data_dir.join(STATE_FILE_NAME),
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_level: Level::INFO,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `PANORAMA_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`; unparsable or empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("PANORAMA_URL") {
            self.panorama_url = url.trim().to_string();
        }
        if let Some(dir) = lookup("PANORAMA_PICTURES_DIR") {
            self.pictures_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("PANORAMA_STATE_PATH") {
            self.state_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("PANORAMA_CHUNK_SIZE").and_then(|v| v.trim().parse().ok()) {
            if size > 0 {
                self.chunk_size = size;
            }
        }
        if let Some(level) = lookup("PANORAMA_LOG").and_then(|v| v.trim().parse().ok()) {
            self.log_level = level;
        }
        self
    }

    /// The single fixed file every download overwrites.
    pub fn destination_path(&self) -> PathBuf {
        self.pictures_dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.panorama_url, DEFAULT_PANORAMA_URL);
        assert_eq!(config.chunk_size, 512);
        assert!(config.destination_path().ends_with("panorama.jpg"));
        assert!(config.state_path.ends_with("FileDownloader.json"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default().with_overrides(lookup_from(&[
            ("PANORAMA_URL", " https://example.com/pano1.jpg "),
            ("PANORAMA_PICTURES_DIR", "/tmp/pics"),
            ("PANORAMA_STATE_PATH", "/tmp/state.json"),
            ("PANORAMA_CHUNK_SIZE", "1024"),
            ("PANORAMA_LOG", "debug"),
        ]));

        assert_eq!(config.panorama_url, "https://example.com/pano1.jpg");
        assert_eq!(config.destination_path(), PathBuf::from("/tmp/pics/panorama.jpg"));
        assert_eq!(config.state_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let config = AppConfig::default().with_overrides(lookup_from(&[
            ("PANORAMA_URL", "   "),
            ("PANORAMA_CHUNK_SIZE", "0"),
            ("PANORAMA_LOG", "loud"),
        ]));

        assert_eq!(config.panorama_url, DEFAULT_PANORAMA_URL);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.log_level, Level::INFO);
    }
}
