//! Catalog writer: pushes local changes back to a remote site.

use crate::config::{RecordType, SyncWriterConfig};
use crate::error::{Result, SyncError};
use crate::remote::{RemoteBookState, RemoteCatalogWriter};
use crate::results::WriterResults;
use crate::server::SyncServer;
use crate::services::SyncServices;
use async_trait::async_trait;
use core_library::{keys, BookRecord, CoverSlot, LibraryError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A write run against one remote site.
#[async_trait]
pub trait SyncWriter: Send + Sync {
    async fn write(&self, cancel: &CancellationToken) -> Result<WriterResults>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookOutcome {
    Written { cover: bool },
    Unchanged,
    Deleted,
    Detached,
}

/// [`SyncWriter`] driving any [`RemoteCatalogWriter`].
///
/// Only books linked to the server (carrying its id key) are considered. A
/// book is pushed when its local modification date is after the remote one.
pub struct CatalogWriter {
    server: SyncServer,
    remote: Arc<dyn RemoteCatalogWriter>,
    services: SyncServices,
    config: SyncWriterConfig,
}

impl CatalogWriter {
    pub fn new(
        server: SyncServer,
        remote: Arc<dyn RemoteCatalogWriter>,
        services: SyncServices,
        config: SyncWriterConfig,
    ) -> Self {
        Self {
            server,
            remote,
            services,
            config,
        }
    }

    async fn sync_book(&self, book: &BookRecord) -> Result<BookOutcome> {
        let book_id = book.id().ok_or_else(|| {
            SyncError::Library(LibraryError::InvalidInput {
                field: keys::PK_ID.to_string(),
                message: "local book has no id".to_string(),
            })
        })?;

        match self.remote.lookup(book).await? {
            RemoteBookState::NotFound if self.config.delete_local_books => {
                self.services.repository.delete(book_id).await?;
                debug!(book_id = %book_id, "Deleted book gone from remote");
                Ok(BookOutcome::Deleted)
            }
            RemoteBookState::NotFound => {
                self.services
                    .repository
                    .clear_fields(book_id, self.server.link_keys())
                    .await?;
                debug!(book_id = %book_id, "Detached book gone from remote");
                Ok(BookOutcome::Detached)
            }
            RemoteBookState::Found { last_modified } => {
                match (book.last_updated(), last_modified) {
                    (Some(local), Some(remote)) if local > remote => {
                        let cover = self.has_front_cover(book).await;
                        self.remote.push_changes(book, cover).await?;
                        Ok(BookOutcome::Written { cover })
                    }
                    _ => Ok(BookOutcome::Unchanged),
                }
            }
        }
    }

    async fn has_front_cover(&self, book: &BookRecord) -> bool {
        if !self.config.includes(RecordType::Cover) {
            return false;
        }
        let Some(uuid) = book.uuid() else {
            return false;
        };
        self.services
            .covers
            .has_cover(&uuid, CoverSlot::Front)
            .await
            .unwrap_or_else(|err| {
                warn!(uuid = %uuid, error = %err, "Cover lookup failed");
                false
            })
    }
}

#[async_trait]
impl SyncWriter for CatalogWriter {
    #[instrument(skip(self, cancel), fields(server = %self.server, incremental = self.config.incremental))]
    async fn write(&self, cancel: &CancellationToken) -> Result<WriterResults> {
        if !self.server.supports_writer() {
            return Err(SyncError::UnsupportedOperation(format!(
                "{} cannot be written to",
                self.server
            )));
        }

        let last_sync_key = self.server.last_sync_key();
        let since = if self.config.incremental {
            match self.config.last_sync_date {
                Some(date) => Some(date),
                None => self.services.last_sync_date(&last_sync_key).await?,
            }
        } else {
            None
        };

        let id_key = self.server.external_id_key();
        let books: Vec<BookRecord> = self
            .services
            .repository
            .find_updated_since(since)
            .await?
            .into_iter()
            .filter(|book| !book.is_blank(id_key))
            .collect();

        info!(since = ?since, books = books.len(), "Writing local changes");

        let mut results = WriterResults::default();
        for book in &books {
            if cancel.is_cancelled() {
                results.cancelled = true;
                break;
            }

            match self.sync_book(book).await {
                Ok(BookOutcome::Written { cover }) => {
                    results.books_written += 1;
                    if cover {
                        results.covers_written += 1;
                    }
                }
                Ok(BookOutcome::Unchanged) => results.books_unchanged += 1,
                Ok(BookOutcome::Deleted) => results.books_deleted += 1,
                Ok(BookOutcome::Detached) => results.books_detached += 1,
                Err(err) if err.is_fatal() => {
                    error!(book_id = ?book.id(), error = %err, "Aborting write");
                    return Err(err);
                }
                Err(err) => {
                    warn!(book_id = ?book.id(), error = %err, "Failed to write book");
                    results.books_failed += 1;
                }
            }
        }

        if results.cancelled {
            info!(%results, "Write cancelled");
        } else {
            self.services.mark_synced(&last_sync_key).await?;
            info!(%results, "Write finished");
        }
        Ok(results)
    }
}
