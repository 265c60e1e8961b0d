use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// No space left while persisting a cover. Fatal for a sync run.
    #[error("Disk full while storing cover {slot} of book {uuid}")]
    DiskFull { uuid: String, slot: usize },

    #[error("Failed to store cover {slot} of book {uuid}: {message}")]
    Storage {
        uuid: String,
        slot: usize,
        message: String,
    },

    #[error("Not a supported image: {}", path.display())]
    InvalidImage { path: PathBuf },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl MetadataError {
    /// The one fatal condition: everything else is recoverable per cover.
    pub fn is_disk_full(&self) -> bool {
        match self {
            MetadataError::DiskFull { .. } => true,
            MetadataError::Bridge(err) => err.is_disk_full(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
