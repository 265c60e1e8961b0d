//! Book repository trait and in-memory implementation

use crate::error::{LibraryError, Result};
use crate::keys;
use crate::models::BookId;
use crate::record::BookRecord;
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Book repository interface for data access operations
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find a book by its row id
    async fn find_by_id(&self, id: BookId) -> Result<Option<BookRecord>>;

    /// Find the first book whose scalar `key` equals `value`
    ///
    /// Readers use this to match a remote book through its site id key.
    async fn find_by_key(&self, key: &str, value: &str) -> Result<Option<BookRecord>>;

    /// Insert a new book and return its id
    ///
    /// A book UUID is generated when the record carries none.
    async fn insert(&self, record: &BookRecord) -> Result<BookId>;

    /// Apply a delta to an existing book
    ///
    /// # Errors
    /// Returns error if:
    /// - The delta has no primary key
    /// - The book does not exist
    async fn update(&self, delta: &BookRecord) -> Result<()>;

    /// Remove the given keys from a book
    async fn clear_fields(&self, id: BookId, keys: &[&str]) -> Result<()>;

    /// Delete a book by id
    ///
    /// # Returns
    /// - `Ok(true)` if the book was deleted
    /// - `Ok(false)` if the book was not found
    async fn delete(&self, id: BookId) -> Result<bool>;

    /// Books modified after `since`, or all books when `since` is `None`
    async fn find_updated_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<BookRecord>>;
}

/// Map-backed [`BookRepository`].
///
/// `update` stamps [`LAST_UPDATED`](keys::LAST_UPDATED) from the injected
/// clock, the way a database trigger would, unless the delta carries its own
/// date (an imported remote date is kept as-is).
pub struct InMemoryBookRepository {
    books: Mutex<IndexMap<BookId, BookRecord>>,
    next_id: Mutex<i64>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            books: Mutex::new(IndexMap::new()),
            next_id: Mutex::new(1),
            clock,
        }
    }

    fn books(&self) -> Result<MutexGuard<'_, IndexMap<BookId, BookRecord>>> {
        self.books
            .lock()
            .map_err(|_| LibraryError::Persistence("book store lock poisoned".to_string()))
    }

    fn allocate_id(&self) -> Result<BookId> {
        let mut next = self
            .next_id
            .lock()
            .map_err(|_| LibraryError::Persistence("id counter lock poisoned".to_string()))?;
        let id = BookId(*next);
        *next += 1;
        Ok(id)
    }

    fn timestamp(&self) -> String {
        self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Number of stored books.
    pub fn len(&self) -> usize {
        self.books.lock().map(|books| books.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_by_id(&self, id: BookId) -> Result<Option<BookRecord>> {
        Ok(self.books()?.get(&id).cloned())
    }

    async fn find_by_key(&self, key: &str, value: &str) -> Result<Option<BookRecord>> {
        Ok(self
            .books()?
            .values()
            .find(|book| book.get_string(key).as_deref() == Some(value))
            .cloned())
    }

    async fn insert(&self, record: &BookRecord) -> Result<BookId> {
        let id = self.allocate_id()?;
        let mut stored = record.clone();
        stored.set_id(id);
        if stored.uuid().is_none() {
            stored.put(keys::BOOK_UUID, uuid::Uuid::new_v4().simple().to_string());
        }
        if !stored.contains(keys::LAST_UPDATED) {
            stored.put(keys::LAST_UPDATED, self.timestamp());
        }

        self.books()?.insert(id, stored);
        debug!(book_id = %id, "Inserted book");
        Ok(id)
    }

    async fn update(&self, delta: &BookRecord) -> Result<()> {
        let id = delta.id().ok_or_else(|| LibraryError::InvalidInput {
            field: keys::PK_ID.to_string(),
            message: "delta has no primary key".to_string(),
        })?;
        let timestamp = self.timestamp();

        let mut books = self.books()?;
        let book = books.get_mut(&id).ok_or_else(|| LibraryError::NotFound {
            entity_type: "Book".to_string(),
            id: id.to_string(),
        })?;

        for (key, value) in delta.iter() {
            book.put(key, value.clone());
        }
        if !delta.contains(keys::LAST_UPDATED) {
            book.put(keys::LAST_UPDATED, timestamp);
        }

        debug!(book_id = %id, fields = delta.len(), "Updated book");
        Ok(())
    }

    async fn clear_fields(&self, id: BookId, keys: &[&str]) -> Result<()> {
        let mut books = self.books()?;
        let book = books.get_mut(&id).ok_or_else(|| LibraryError::NotFound {
            entity_type: "Book".to_string(),
            id: id.to_string(),
        })?;
        for key in keys {
            book.remove(key);
        }
        Ok(())
    }

    async fn delete(&self, id: BookId) -> Result<bool> {
        let removed = self.books()?.shift_remove(&id).is_some();
        if removed {
            debug!(book_id = %id, "Deleted book");
        }
        Ok(removed)
    }

    async fn find_updated_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<BookRecord>> {
        Ok(self
            .books()?
            .values()
            .filter(|book| match since {
                None => true,
                Some(since) => book.last_updated().is_some_and(|updated| updated > since),
            })
            .cloned()
            .collect())
    }
}
