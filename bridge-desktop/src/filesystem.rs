//! [`FileSystemAccess`] over `tokio::fs`.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Per-user directory for the library database and covers.
///
/// `<data dir>/bookshelf`, falling back to the temp directory on systems
/// without a data directory.
pub fn default_library_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
        .join("bookshelf")
}

/// Desktop file access. Every I/O error goes through
/// [`BridgeError::from_io`], so a full volume becomes `DiskFull`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BridgeError + '_ {
    move |err| BridgeError::from_io(err, path)
}

/// Sibling of `to` that a copy is staged in before it replaces `to`.
fn staging_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!(".{name}.partial"))
}

/// Copy `from` next to `to` and rename it over `to`.
///
/// `to` is either left untouched or fully replaced; a failed copy never
/// leaves a truncated file behind.
async fn copy_into_place(from: &Path, to: &Path) -> Result<()> {
    let staging = staging_path(to);
    let copied = match fs::copy(from, &staging).await {
        Ok(_) => fs::rename(&staging, to).await.map_err(io_error(to)),
        Err(err) => Err(BridgeError::from_io(err, to)),
    };
    if copied.is_err() {
        if let Err(err) = fs::remove_file(&staging).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %err, "Failed to remove partial copy");
            }
        }
    }
    copied
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn file_size(&self, path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.len())),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BridgeError::from_io(err, path)),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(io_error(path))
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(io_error(path))?;
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }
        fs::write(path, &data).await.map_err(io_error(path))?;
        debug!(path = %path.display(), bytes = data.len(), "Wrote file");
        Ok(())
    }

    async fn rename_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }

        let Err(err) = fs::rename(from, to).await else {
            return Ok(());
        };
        // Downloads may sit on another volume than the library.
        if err.kind() != ErrorKind::CrossesDevices {
            return Err(BridgeError::from_io(err, from));
        }
        copy_into_place(from, to).await?;
        self.remove_file(from).await?;
        debug!(from = %from.display(), to = %to.display(), "Moved file across volumes");
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(BridgeError::from_io(err, path)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_and_size() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("covers").join("5f1c.jpg");

        assert_eq!(fs.file_size(&path).await.unwrap(), None);

        fs.write_file(&path, Bytes::from_static(b"\xFF\xD8\xFF"))
            .await
            .unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap().as_ref(), b"\xFF\xD8\xFF");
        assert_eq!(fs.file_size(&path).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_directory_has_no_size() {
        let dir = TempDir::new().unwrap();
        assert_eq!(TokioFileSystem::new().file_size(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rename_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let download = dir.path().join("tmp").join("cover.jpg");
        let stored = dir.path().join("covers").join("5f1c_1.jpg");

        fs.write_file(&download, Bytes::from_static(b"jpeg")).await.unwrap();
        fs.rename_file(&download, &stored).await.unwrap();

        assert_eq!(fs.file_size(&download).await.unwrap(), None);
        assert_eq!(fs.file_size(&stored).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();

        let err = fs.read_file(&dir.path().join("gone.jpg")).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));

        let err = fs
            .rename_file(&dir.path().join("gone.jpg"), &dir.path().join("x.jpg"))
            .await
            .unwrap_err();
        assert!(!err.is_disk_full());
    }

    #[tokio::test]
    async fn test_copy_into_place_replaces_target() {
        let dir = TempDir::new().unwrap();
        let download = dir.path().join("cover.jpg");
        let stored = dir.path().join("5f1c_0.jpg");
        fs::write(&download, b"new cover").await.unwrap();
        fs::write(&stored, b"old").await.unwrap();

        copy_into_place(&download, &stored).await.unwrap();

        assert_eq!(fs::read(&stored).await.unwrap(), b"new cover");
        assert!(!staging_path(&stored).exists());
    }

    #[tokio::test]
    async fn test_failed_copy_keeps_existing_target() {
        let dir = TempDir::new().unwrap();
        let stored = dir.path().join("5f1c_0.jpg");
        fs::write(&stored, b"good cover").await.unwrap();
        // Leftover from an interrupted earlier attempt.
        fs::write(staging_path(&stored), b"trunc").await.unwrap();

        let err = copy_into_place(&dir.path().join("gone.jpg"), &stored)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(_)));
        assert_eq!(fs::read(&stored).await.unwrap(), b"good cover");
        assert!(!staging_path(&stored).exists());
    }

    #[test]
    fn test_staging_path_is_a_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/lib/covers/5f1c_0.jpg")),
            PathBuf::from("/lib/covers/.5f1c_0.jpg.partial")
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("cover.jpg");

        fs.write_file(&path, Bytes::from_static(b"x")).await.unwrap();
        fs.remove_file(&path).await.unwrap();
        fs.remove_file(&path).await.unwrap();
        assert_eq!(fs.file_size(&path).await.unwrap(), None);
    }

    #[test]
    fn test_default_library_dir() {
        assert!(default_library_dir().ends_with("bookshelf"));
    }
}
