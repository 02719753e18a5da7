pub mod error;
pub mod model;

pub use error::{DownloadError, Listener};
pub use model::{DownloadPhase, DownloadRequest, DownloadedFile, ProgressState};
