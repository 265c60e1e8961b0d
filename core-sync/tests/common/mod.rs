//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::SqliteSettingsStore;
use bridge_traits::time::FixedClock;
use chrono::{DateTime, TimeZone, Utc};
use core_library::{BookRecord, CoverSlot, InMemoryBookRepository, Page, PageRequest};
use core_metadata::{CoverFile, CoverStorage, MetadataError};
use core_sync::{RemoteBook, RemoteCatalog, SyncError, SyncServices};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistFailure {
    DiskFull,
    Io,
}

/// Cover storage keeping file sizes in memory.
#[derive(Default)]
pub struct ScriptedCovers {
    sizes: Mutex<HashMap<(String, CoverSlot), u64>>,
    persisted: Mutex<Vec<(PathBuf, String, CoverSlot)>>,
    failure: Option<PersistFailure>,
}

impl ScriptedCovers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: PersistFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn with_cover(self, uuid: &str, slot: CoverSlot, size: u64) -> Self {
        self.sizes
            .lock()
            .unwrap()
            .insert((uuid.to_string(), slot), size);
        self
    }

    pub fn persisted(&self) -> Vec<(PathBuf, String, CoverSlot)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoverStorage for ScriptedCovers {
    async fn persisted_file(
        &self,
        uuid: &str,
        slot: CoverSlot,
    ) -> core_metadata::Result<Option<CoverFile>> {
        let sizes = self.sizes.lock().unwrap();
        Ok(sizes
            .get(&(uuid.to_string(), slot))
            .map(|size| CoverFile {
                path: PathBuf::from(format!("{uuid}_{}.jpg", slot.index())),
                size: *size,
            }))
    }

    async fn persist(
        &self,
        source: &Path,
        uuid: &str,
        slot: CoverSlot,
    ) -> core_metadata::Result<PathBuf> {
        match self.failure {
            Some(PersistFailure::DiskFull) => Err(MetadataError::DiskFull {
                uuid: uuid.to_string(),
                slot: slot.index(),
            }),
            Some(PersistFailure::Io) => Err(MetadataError::Storage {
                uuid: uuid.to_string(),
                slot: slot.index(),
                message: "permission denied".to_string(),
            }),
            None => {
                self.persisted
                    .lock()
                    .unwrap()
                    .push((source.to_path_buf(), uuid.to_string(), slot));
                self.sizes
                    .lock()
                    .unwrap()
                    .insert((uuid.to_string(), slot), 2048);
                Ok(PathBuf::from(format!("{uuid}_{}.jpg", slot.index())))
            }
        }
    }
}

/// Remote site serving a fixed collection.
#[derive(Default)]
pub struct FakeCatalog {
    books: Vec<RemoteBook>,
    records: HashMap<String, BookRecord>,
    fetches: Mutex<Vec<(String, [bool; 2])>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(mut self, book: RemoteBook, record: BookRecord) -> Self {
        self.records.insert(book.external_id.clone(), record);
        self.books.push(book);
        self
    }

    /// Listed by the site but failing to download.
    pub fn with_broken_book(mut self, book: RemoteBook) -> Self {
        self.books.push(book);
        self
    }

    /// Cancel `token` once `fetches` books have been downloaded.
    pub fn cancel_after(mut self, fetches: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((fetches, token));
        self
    }

    pub fn fetches(&self) -> Vec<(String, [bool; 2])> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn fetch_page(
        &self,
        request: PageRequest,
        since: Option<DateTime<Utc>>,
    ) -> core_sync::Result<Page<RemoteBook>> {
        let listed: Vec<RemoteBook> = self
            .books
            .iter()
            .filter(|book| match (since, book.last_modified) {
                (Some(since), Some(modified)) => modified > since,
                _ => true,
            })
            .cloned()
            .collect();
        Ok(Page::from_slice(&listed, request))
    }

    async fn fetch_book(&self, external_id: &str, covers: [bool; 2]) -> core_sync::Result<BookRecord> {
        let count = {
            let mut fetches = self.fetches.lock().unwrap();
            fetches.push((external_id.to_string(), covers));
            fetches.len()
        };
        if let Some((limit, token)) = &self.cancel_after {
            if count >= *limit {
                token.cancel();
            }
        }

        let mut record = self
            .records
            .get(external_id)
            .cloned()
            .ok_or_else(|| SyncError::Remote(format!("book {external_id} unavailable")))?;
        for slot in CoverSlot::ALL {
            if !covers[slot.index()] {
                record.remove(slot.tmp_file_key());
            }
        }
        Ok(record)
    }
}

pub struct Harness {
    pub repository: Arc<InMemoryBookRepository>,
    pub covers: Arc<ScriptedCovers>,
    pub settings: Arc<SqliteSettingsStore>,
    pub now: DateTime<Utc>,
}

impl Harness {
    pub async fn new(covers: ScriptedCovers) -> Self {
        let now = at(2025, 6, 1);
        Self {
            repository: Arc::new(InMemoryBookRepository::with_clock(Arc::new(FixedClock(now)))),
            covers: Arc::new(covers),
            settings: Arc::new(SqliteSettingsStore::in_memory().await.unwrap()),
            now,
        }
    }

    pub fn services(&self) -> SyncServices {
        SyncServices::new(
            self.repository.clone(),
            self.covers.clone(),
            self.settings.clone(),
        )
        .with_clock(Arc::new(FixedClock(self.now)))
    }
}
