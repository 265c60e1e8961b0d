//! Run summaries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters of a read run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReaderResults {
    pub books_created: u64,
    pub books_updated: u64,
    pub books_skipped: u64,
    pub books_failed: u64,
    pub covers_updated: u64,
    /// The run stopped early on request.
    pub cancelled: bool,
}

impl ReaderResults {
    pub fn books_processed(&self) -> u64 {
        self.books_created + self.books_updated + self.books_skipped + self.books_failed
    }
}

impl fmt::Display for ReaderResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books updated / {} covers updated",
            self.books_created + self.books_updated,
            self.covers_updated
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

/// Counters of a write run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriterResults {
    pub books_written: u64,
    pub books_unchanged: u64,
    /// Local books deleted because the remote copy is gone.
    pub books_deleted: u64,
    /// Local books unlinked from the server because the remote copy is gone.
    pub books_detached: u64,
    pub books_failed: u64,
    pub covers_written: u64,
    pub cancelled: bool,
}

impl WriterResults {
    pub fn books_processed(&self) -> u64 {
        self.books_written
            + self.books_unchanged
            + self.books_deleted
            + self.books_detached
            + self.books_failed
    }
}

impl fmt::Display for WriterResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} books updated / {} covers updated",
            self.books_written, self.covers_written
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
