//! # Catalog Reader
//!
//! Imports a remote collection into the local library.
//!
//! ## Workflow
//!
//! 1. Page through the remote collection (limited to books changed since the
//!    sync date when existing books are skipped or only newer ones merged)
//! 2. Look each book up locally through the server's id key
//! 3. Unknown books are fetched in full and inserted, covers included when
//!    the config asks for them
//! 4. Known books follow the [`Updates`] option; a merge runs the field
//!    registry's filter, fetches only what is needed, and persists the delta
//! 5. Record the sync date
//!
//! Cancellation is checked between books. A full disk aborts the run; any
//! other per-book failure is counted and the run moves on.

use crate::config::{RecordType, SyncReaderConfig, Updates};
use crate::error::{Result, SyncError};
use crate::processor::{covers_wanted, persist_cover, SyncReaderProcessor};
use crate::remote::{RemoteBook, RemoteCatalog};
use crate::results::ReaderResults;
use crate::server::SyncServer;
use crate::services::SyncServices;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_library::{keys, BookRecord, CoverSlot, LibraryError, PageRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Default number of remote books requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// A read run against one remote site.
#[async_trait]
pub trait SyncReader: Send + Sync {
    async fn read(&self, cancel: &CancellationToken) -> Result<ReaderResults>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookOutcome {
    Created { covers: usize },
    Updated { covers: usize },
    Unchanged { covers: usize },
    Skipped,
}

/// [`SyncReader`] driving any [`RemoteCatalog`].
pub struct CatalogReader {
    server: SyncServer,
    remote: Arc<dyn RemoteCatalog>,
    services: SyncServices,
    config: SyncReaderConfig,
    processor: SyncReaderProcessor,
    page_size: u32,
}

impl CatalogReader {
    pub fn new(
        server: SyncServer,
        remote: Arc<dyn RemoteCatalog>,
        services: SyncServices,
        config: SyncReaderConfig,
        processor: SyncReaderProcessor,
    ) -> Self {
        Self {
            server,
            remote,
            services,
            config,
            processor,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn processor(&self) -> &SyncReaderProcessor {
        &self.processor
    }

    fn since(&self) -> Option<DateTime<Utc>> {
        match self.config.updates {
            Updates::Skip | Updates::OnlyNewer => self.config.sync_date,
            Updates::Overwrite => None,
        }
    }

    fn covers_allowed(&self, wanted: [bool; 2]) -> [bool; 2] {
        let allowed = self.config.includes(RecordType::Cover);
        wanted.map(|slot| slot && allowed)
    }

    async fn handle_book(&self, remote: &RemoteBook) -> Result<BookOutcome> {
        let local = self
            .services
            .repository
            .find_by_key(self.server.external_id_key(), &remote.external_id)
            .await?;

        let Some(local) = local else {
            return self.insert_book(remote).await;
        };

        match self.config.updates {
            Updates::Skip => Ok(BookOutcome::Skipped),
            Updates::Overwrite => self.update_book(remote, &local).await,
            Updates::OnlyNewer => match (remote.last_modified, local.last_updated()) {
                (Some(remote_date), Some(local_date)) if remote_date > local_date => {
                    self.update_book(remote, &local).await
                }
                _ => Ok(BookOutcome::Skipped),
            },
        }
    }

    async fn update_book(&self, remote: &RemoteBook, local: &BookRecord) -> Result<BookOutcome> {
        let book_id = local.id().ok_or_else(|| {
            SyncError::Library(LibraryError::InvalidInput {
                field: keys::PK_ID.to_string(),
                message: "local book has no id".to_string(),
            })
        })?;

        let wanted = self
            .processor
            .filter(local, self.services.covers.as_ref())
            .await;
        let covers = self.covers_allowed(covers_wanted(&wanted));
        let fetched = self.remote.fetch_book(&remote.external_id, covers).await?;

        let outcome = self
            .processor
            .merge(&self.services.merge_context(), book_id, local, &wanted, fetched)
            .await?;

        match outcome.delta {
            Some(delta) => {
                self.services.repository.update(&delta).await?;
                debug!(book_id = %book_id, fields = delta.len(), "Updated book");
                Ok(BookOutcome::Updated {
                    covers: outcome.covers_stored,
                })
            }
            None => Ok(BookOutcome::Unchanged {
                covers: outcome.covers_stored,
            }),
        }
    }

    async fn insert_book(&self, remote: &RemoteBook) -> Result<BookOutcome> {
        let covers = self.covers_allowed([true, true]);
        let mut record = self.remote.fetch_book(&remote.external_id, covers).await?;

        let id_key = self.server.external_id_key();
        if !record.contains(id_key) {
            record.put(id_key, remote.external_id.as_str());
        }
        record.remove(keys::PK_ID);

        let downloads: Vec<(CoverSlot, String)> = CoverSlot::ALL
            .into_iter()
            .filter_map(|slot| {
                record
                    .remove(slot.tmp_file_key())
                    .and_then(|value| value.to_plain_string())
                    .filter(|file_spec| !file_spec.is_empty())
                    .map(|file_spec| (slot, file_spec))
            })
            .collect();

        let book_id = self.services.repository.insert(&record).await?;
        debug!(book_id = %book_id, external_id = %remote.external_id, "Inserted book");

        let mut stored = 0;
        if !downloads.is_empty() {
            let uuid = self
                .services
                .repository
                .find_by_id(book_id)
                .await?
                .and_then(|book| book.uuid());
            for (slot, file_spec) in downloads {
                if persist_cover(
                    self.services.covers.as_ref(),
                    uuid.as_deref(),
                    slot,
                    &file_spec,
                )
                .await?
                {
                    stored += 1;
                }
            }
        }

        Ok(BookOutcome::Created { covers: stored })
    }
}

fn record_outcome(results: &mut ReaderResults, outcome: BookOutcome) {
    match outcome {
        BookOutcome::Created { covers } => {
            results.books_created += 1;
            results.covers_updated += covers as u64;
        }
        BookOutcome::Updated { covers } => {
            results.books_updated += 1;
            results.covers_updated += covers as u64;
        }
        BookOutcome::Unchanged { covers } => {
            results.books_skipped += 1;
            results.covers_updated += covers as u64;
        }
        BookOutcome::Skipped => results.books_skipped += 1,
    }
}

#[async_trait]
impl SyncReader for CatalogReader {
    #[instrument(skip(self, cancel), fields(server = %self.server, updates = ?self.config.updates))]
    async fn read(&self, cancel: &CancellationToken) -> Result<ReaderResults> {
        let since = self.since();
        let mut results = ReaderResults::default();
        let mut request = Some(PageRequest::new(0, self.page_size));

        info!(since = ?since, "Reading remote collection");

        'pages: while let Some(current) = request {
            if cancel.is_cancelled() {
                results.cancelled = true;
                break;
            }

            let page = self.remote.fetch_page(current, since).await?;
            for remote in &page.items {
                if cancel.is_cancelled() {
                    results.cancelled = true;
                    break 'pages;
                }

                match self.handle_book(remote).await {
                    Ok(outcome) => record_outcome(&mut results, outcome),
                    Err(err) if err.is_fatal() => {
                        error!(
                            external_id = %remote.external_id,
                            error = %err,
                            processed = results.books_processed(),
                            "Aborting read"
                        );
                        return Err(err);
                    }
                    Err(err) => {
                        warn!(external_id = %remote.external_id, error = %err, "Failed to read book");
                        results.books_failed += 1;
                    }
                }
            }

            request = page.next_request();
        }

        if results.cancelled {
            info!(%results, "Read cancelled");
        } else {
            self.services
                .mark_synced(&self.server.last_sync_key())
                .await?;
            info!(%results, "Read finished");
        }
        Ok(results)
    }
}
