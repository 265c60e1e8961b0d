//! Cover files and preference storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// File operations needed to keep cover images.
///
/// Covers arrive as downloads in a temp directory and are moved next to the
/// library. A zero-length or missing file counts as no cover, so the only
/// query is [`file_size`](Self::file_size).
///
/// Implementations must report a full volume as
/// [`BridgeError::DiskFull`](crate::error::BridgeError::DiskFull) and a
/// missing path as [`BridgeError::NotFound`](crate::error::BridgeError::NotFound).
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Size in bytes of a regular file; `None` when there is no such file.
    async fn file_size(&self, path: &Path) -> Result<Option<u64>>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write `data`, creating parent directories as needed.
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Move `from` to `to`, replacing `to`.
    async fn rename_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Remove a file; removing a missing file is not an error.
    async fn remove_file(&self, path: &Path) -> Result<()>;
}

/// Typed key/value preferences.
///
/// Sync stores one `i64` ordinal per field under a per-site prefix, hidden
/// fields as `bool`s, and last sync dates as RFC 3339 strings. A value read
/// with a different type than it was written with is an error.
///
/// ```ignore
/// store.set_i64("calibre.sync.fields.update.title", 3).await?;
/// let stored = store.list_keys_with_prefix("calibre.sync.fields.update.").await?;
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, compared case-sensitively, sorted.
    async fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
