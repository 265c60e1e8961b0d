use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The target volume has no space left.
    ///
    /// Kept apart from [`BridgeError::Io`] so callers can tell a full disk
    /// from a transient failure.
    #[error("Disk full while writing {}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".to_string()))]
    DiskFull { path: Option<PathBuf> },

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl BridgeError {
    /// Map an I/O error that happened while touching `path`.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull => BridgeError::DiskFull {
                path: Some(path.into()),
            },
            io::ErrorKind::NotFound => BridgeError::NotFound(path.into().display().to_string()),
            _ => BridgeError::Io(err),
        }
    }

    pub fn is_disk_full(&self) -> bool {
        matches!(self, BridgeError::DiskFull { .. })
    }
}

impl From<io::Error> for BridgeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull => BridgeError::DiskFull { path: None },
            _ => BridgeError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
