//! Remote catalog seams
//!
//! Site clients (HTTP, scraping, authentication) live outside this crate and
//! plug in through these traits. Cover images are downloaded by the client
//! into a temp file and handed over as a path under
//! [`TMP_FILE_SPEC`](core_library::keys::TMP_FILE_SPEC).

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_library::{BookRecord, Page, PageRequest};

/// Entry of a remote collection page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBook {
    /// The site's id for the book, matched against the server's id key.
    pub external_id: String,
    /// `None` when the site does not track modification dates.
    pub last_modified: Option<DateTime<Utc>>,
}

impl RemoteBook {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            last_modified: None,
        }
    }

    pub fn modified_at(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }
}

/// Read side of a remote catalog.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// One page of the user's remote collection.
    ///
    /// `since` asks for books changed after that date; sites that cannot
    /// filter may ignore it.
    async fn fetch_page(
        &self,
        request: PageRequest,
        since: Option<DateTime<Utc>>,
    ) -> Result<Page<RemoteBook>>;

    /// Full data of one book.
    ///
    /// `covers` selects the slots to download (front, back).
    async fn fetch_book(&self, external_id: &str, covers: [bool; 2]) -> Result<BookRecord>;
}

/// What the remote side knows about a local book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBookState {
    NotFound,
    Found {
        last_modified: Option<DateTime<Utc>>,
    },
}

/// Write side of a remote catalog.
#[async_trait]
pub trait RemoteCatalogWriter: Send + Sync {
    async fn lookup(&self, book: &BookRecord) -> Result<RemoteBookState>;

    /// Send the local state of `book`, including its cover when `with_cover`.
    async fn push_changes(&self, book: &BookRecord, with_cover: bool) -> Result<()>;
}
