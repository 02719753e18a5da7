pub mod file_downloader;

pub use file_downloader::{DownloadEvent, DownloadHandle, FileDownloader};
