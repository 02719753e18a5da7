use std::fmt;

use thiserror::Error;

/// Which callback slot a precondition check found empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    Progress,
    Completion,
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Progress => write!(f, "Progress listener"),
            Listener::Completion => write!(f, "File downloaded listener"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Download record error: {0}")]
    Store(String),

    /// Fatal precondition failure: a listener was required but missing.
    #[error("{0} not registered")]
    ListenerNotRegistered(Listener),

    #[error("Download worker failed: {0}")]
    Worker(String),
}

impl DownloadError {
    /// Transient failures are logged and dropped by the listener API;
    /// precondition failures are not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DownloadError::ListenerNotRegistered(_))
    }
}

impl From<crate::api::ApiError> for DownloadError {
    fn from(e: crate::api::ApiError) -> Self {
        match e {
            crate::api::ApiError::Status(code) => DownloadError::Status(code),
            other => DownloadError::Http(other.to_string()),
        }
    }
}

impl From<crate::store::StoreError> for DownloadError {
    fn from(e: crate::store::StoreError) -> Self {
        DownloadError::Store(e.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        DownloadError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_messages() {
        assert_eq!(
            DownloadError::ListenerNotRegistered(Listener::Progress).to_string(),
            "Progress listener not registered"
        );
        assert_eq!(
            DownloadError::ListenerNotRegistered(Listener::Completion).to_string(),
            "File downloaded listener not registered"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(DownloadError::Http("refused".into()).is_transient());
        assert!(DownloadError::Status(404).is_transient());
        assert!(!DownloadError::ListenerNotRegistered(Listener::Completion).is_transient());
    }
}
