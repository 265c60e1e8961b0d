//! Sync session configuration
//!
//! Plain holders for what a single read or write run should do. The
//! [helpers](crate::helper) fill them in from user choices and validate them
//! against the selected [`SyncServer`](crate::SyncServer).

use crate::error::{Result, SyncError};
use crate::processor::SyncReaderProcessor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kinds of data a run transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Books,
    Cover,
}

/// What a reader does with books that already exist locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Updates {
    /// Leave existing books alone; only new books are added.
    Skip,
    /// Merge remote data into every existing book.
    Overwrite,
    /// Merge only when the remote book changed after the local one.
    #[default]
    OnlyNewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReaderConfig {
    pub record_types: BTreeSet<RecordType>,
    pub updates: Updates,
    /// Only consider remote books changed after this date.
    pub sync_date: Option<DateTime<Utc>>,
    /// Overrides the server's default field registry.
    pub processor: Option<SyncReaderProcessor>,
}

impl Default for SyncReaderConfig {
    fn default() -> Self {
        Self {
            record_types: BTreeSet::from([RecordType::Books, RecordType::Cover]),
            updates: Updates::default(),
            sync_date: None,
            processor: None,
        }
    }
}

impl SyncReaderConfig {
    pub fn includes(&self, record_type: RecordType) -> bool {
        self.record_types.contains(&record_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_types.is_empty() {
            return Err(SyncError::InvalidArgument(
                "no record types selected for reading".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWriterConfig {
    pub record_types: BTreeSet<RecordType>,
    /// Only push books changed since the last sync.
    pub incremental: bool,
    /// Delete local books that no longer exist remotely; otherwise they are
    /// only unlinked from the server.
    pub delete_local_books: bool,
    /// Overrides the stored last sync date.
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl Default for SyncWriterConfig {
    fn default() -> Self {
        Self {
            record_types: BTreeSet::from([RecordType::Books, RecordType::Cover]),
            incremental: true,
            delete_local_books: false,
            last_sync_date: None,
        }
    }
}

impl SyncWriterConfig {
    pub fn includes(&self, record_type: RecordType) -> bool {
        self.record_types.contains(&record_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_types.is_empty() {
            return Err(SyncError::InvalidArgument(
                "no record types selected for writing".to_string(),
            ));
        }
        Ok(())
    }
}
