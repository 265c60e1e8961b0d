//! Cover Storage - Persist Downloaded Book Covers
//!
//! Remote catalog readers download cover images into a temporary directory
//! and hand the file path over in the book record. During a sync the merge
//! engine asks a [`CoverStorage`] to move that file into permanent storage,
//! where it is keyed by the book UUID and the cover slot.
//!
//! ## Overview
//!
//! - Front covers are stored as `{uuid}.jpg`, back covers as `{uuid}_1.jpg`
//! - The file content is sniffed before it is accepted; empty files and
//!   unrecognised formats are rejected
//! - A full volume surfaces as [`MetadataError::DiskFull`] so a sync run can
//!   abort, any other failure as [`MetadataError::Storage`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{CoverStorage, FileCoverStorage};
//! use core_library::CoverSlot;
//!
//! # async fn example(config: &core_runtime::CoreConfig) -> core_metadata::Result<()> {
//! let storage = FileCoverStorage::from_config(config);
//! let path = storage
//!     .persist("/tmp/covers/tmp/dl_42.jpg".as_ref(), "9b0f...", CoverSlot::Front)
//!     .await?;
//! assert!(storage.has_cover("9b0f...", CoverSlot::Front).await?);
//! # Ok(())
//! # }
//! ```

use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::storage::FileSystemAccess;
use core_library::CoverSlot;
use core_runtime::logging::strip_path;
use core_runtime::CoreConfig;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A cover file in permanent storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverFile {
    pub path: PathBuf,
    pub size: u64,
}

impl CoverFile {
    /// A zero-byte file counts as no cover.
    pub fn is_blank(&self) -> bool {
        self.size == 0
    }
}

/// Permanent storage for book covers.
#[async_trait]
pub trait CoverStorage: Send + Sync {
    /// The stored cover of a book, if a file exists for the slot.
    async fn persisted_file(&self, uuid: &str, slot: CoverSlot) -> Result<Option<CoverFile>>;

    /// Move a downloaded file into permanent storage and return its new path.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::DiskFull`] when the volume is full
    /// - [`MetadataError::InvalidImage`] when the file is empty or not an image
    /// - [`MetadataError::Storage`] for any other failure
    async fn persist(&self, source: &Path, uuid: &str, slot: CoverSlot) -> Result<PathBuf>;

    /// Whether a non-empty cover is stored for the slot.
    async fn has_cover(&self, uuid: &str, slot: CoverSlot) -> Result<bool> {
        Ok(self
            .persisted_file(uuid, slot)
            .await?
            .is_some_and(|file| !file.is_blank()))
    }
}

/// [`CoverStorage`] on top of the platform file system bridge.
pub struct FileCoverStorage {
    fs: Arc<dyn FileSystemAccess>,
    covers_dir: PathBuf,
}

impl FileCoverStorage {
    pub fn new(fs: Arc<dyn FileSystemAccess>, covers_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            covers_dir: covers_dir.into(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.file_system), config.covers_dir.clone())
    }

    pub fn covers_dir(&self) -> &Path {
        &self.covers_dir
    }

    /// Where the cover of `uuid` lives for `slot`.
    pub fn cover_path(&self, uuid: &str, slot: CoverSlot) -> PathBuf {
        let name = match slot {
            CoverSlot::Front => format!("{uuid}.jpg"),
            CoverSlot::Back => format!("{uuid}_{}.jpg", slot.index()),
        };
        self.covers_dir.join(name)
    }

    fn storage_error(err: BridgeError, uuid: &str, slot: CoverSlot) -> MetadataError {
        if err.is_disk_full() {
            MetadataError::DiskFull {
                uuid: uuid.to_string(),
                slot: slot.index(),
            }
        } else {
            MetadataError::Storage {
                uuid: uuid.to_string(),
                slot: slot.index(),
                message: err.to_string(),
            }
        }
    }

    /// Reject empty files and anything `image` cannot identify.
    async fn sniff(&self, source: &Path, uuid: &str, slot: CoverSlot) -> Result<ImageFormat> {
        let data = self
            .fs
            .read_file(source)
            .await
            .map_err(|err| Self::storage_error(err, uuid, slot))?;

        if data.is_empty() {
            return Err(MetadataError::InvalidImage {
                path: source.to_path_buf(),
            });
        }

        image::guess_format(&data).map_err(|_| MetadataError::InvalidImage {
            path: source.to_path_buf(),
        })
    }
}

#[async_trait]
impl CoverStorage for FileCoverStorage {
    async fn persisted_file(&self, uuid: &str, slot: CoverSlot) -> Result<Option<CoverFile>> {
        let path = self.cover_path(uuid, slot);
        let size = self
            .fs
            .file_size(&path)
            .await
            .map_err(|err| Self::storage_error(err, uuid, slot))?;
        Ok(size.map(|size| CoverFile { path, size }))
    }

    #[instrument(
        skip(self, source, slot),
        fields(file = strip_path(&source.to_string_lossy()), slot = slot.index())
    )]
    async fn persist(&self, source: &Path, uuid: &str, slot: CoverSlot) -> Result<PathBuf> {
        let format = self.sniff(source, uuid, slot).await?;
        if format != ImageFormat::Jpeg {
            debug!(?format, "Storing non-JPEG cover under .jpg");
        }

        self.fs
            .create_dir_all(&self.covers_dir)
            .await
            .map_err(|err| Self::storage_error(err, uuid, slot))?;

        let destination = self.cover_path(uuid, slot);
        if let Err(err) = self.fs.rename_file(source, &destination).await {
            if !err.is_disk_full() {
                warn!(error = %err, "Failed to move cover into place");
            }
            return Err(Self::storage_error(err, uuid, slot));
        }

        debug!(path = %destination.display(), "Stored cover");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;
    use bytes::Bytes;
    use mockall::mock;
    use tempfile::TempDir;

    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    mock! {
        pub Fs {}

        #[async_trait::async_trait]
        impl FileSystemAccess for Fs {
            async fn file_size(&self, path: &Path) -> bridge_traits::error::Result<Option<u64>>;
            async fn create_dir_all(&self, path: &Path) -> bridge_traits::error::Result<()>;
            async fn read_file(&self, path: &Path) -> bridge_traits::error::Result<Bytes>;
            async fn write_file(&self, path: &Path, data: Bytes) -> bridge_traits::error::Result<()>;
            async fn rename_file(&self, from: &Path, to: &Path) -> bridge_traits::error::Result<()>;
            async fn remove_file(&self, path: &Path) -> bridge_traits::error::Result<()>;
        }
    }

    fn storage_in(dir: &TempDir) -> FileCoverStorage {
        FileCoverStorage::new(Arc::new(TokioFileSystem::new()), dir.path().join("covers"))
    }

    fn write_download(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_cover_path_per_slot() {
        let storage = FileCoverStorage::new(Arc::new(MockFs::new()), "/covers");
        assert_eq!(
            storage.cover_path("abc", CoverSlot::Front),
            PathBuf::from("/covers/abc.jpg")
        );
        assert_eq!(
            storage.cover_path("abc", CoverSlot::Back),
            PathBuf::from("/covers/abc_1.jpg")
        );
    }

    #[tokio::test]
    async fn test_persist_moves_file_into_place() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let download = write_download(&dir, "dl.jpg", JPEG_HEADER);

        assert!(!storage.has_cover("abc", CoverSlot::Front).await.unwrap());

        let stored = storage
            .persist(&download, "abc", CoverSlot::Front)
            .await
            .unwrap();

        assert_eq!(stored, dir.path().join("covers").join("abc.jpg"));
        assert!(!download.exists());
        assert!(storage.has_cover("abc", CoverSlot::Front).await.unwrap());
        assert!(!storage.has_cover("abc", CoverSlot::Back).await.unwrap());

        let file = storage
            .persisted_file("abc", CoverSlot::Front)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.size, JPEG_HEADER.len() as u64);
    }

    #[tokio::test]
    async fn test_persist_accepts_other_formats() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let download = write_download(&dir, "dl.png", PNG_HEADER);

        let stored = storage
            .persist(&download, "abc", CoverSlot::Back)
            .await
            .unwrap();
        assert!(stored.ends_with("abc_1.jpg"));
    }

    #[tokio::test]
    async fn test_persist_rejects_empty_and_garbage() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let empty = write_download(&dir, "empty.jpg", b"");
        let err = storage
            .persist(&empty, "abc", CoverSlot::Front)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidImage { .. }));

        let garbage = write_download(&dir, "garbage.jpg", b"<html>not found</html>");
        let err = storage
            .persist(&garbage, "abc", CoverSlot::Front)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::InvalidImage { .. }));
        assert!(!storage.has_cover("abc", CoverSlot::Front).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_download_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let err = storage
            .persist(&dir.path().join("nope.jpg"), "abc", CoverSlot::Front)
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Storage { slot: 0, .. }));
        assert!(!err.is_disk_full());
    }

    #[tokio::test]
    async fn test_disk_full_on_rename() {
        let mut fs = MockFs::new();
        fs.expect_read_file()
            .returning(|_| Ok(Bytes::from_static(JPEG_HEADER)));
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_rename_file()
            .returning(|_, to| Err(BridgeError::DiskFull { path: Some(to.to_path_buf()) }));

        let storage = FileCoverStorage::new(Arc::new(fs), "/covers");
        let err = storage
            .persist(Path::new("/tmp/dl.jpg"), "abc", CoverSlot::Back)
            .await
            .unwrap_err();

        assert!(matches!(err, MetadataError::DiskFull { slot: 1, .. }));
        assert!(err.is_disk_full());
    }
}
