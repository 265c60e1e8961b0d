use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use core_metadata::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Programmer error: bad builder input, an append on a non-list field, an
    /// empty record type selection.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown sync server: {0}")]
    UnknownServer(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No space left to store a cover. Aborts the whole run.
    #[error("Disk full: {0}")]
    DiskFull(#[source] MetadataError),

    #[error("Cover storage error: {0}")]
    Metadata(#[source] MetadataError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Remote catalog error: {0}")]
    Remote(String),

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Errors that must stop a run instead of being counted against one book.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::DiskFull(_) | SyncError::InvalidArgument(_) | SyncError::Cancelled
        )
    }
}

impl From<MetadataError> for SyncError {
    fn from(err: MetadataError) -> Self {
        if err.is_disk_full() {
            SyncError::DiskFull(err)
        } else {
            SyncError::Metadata(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
