//! Upload directory on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use quill_core::ports::{FileStore, StorageError, check_file_name};

/// Flat directory of uploaded files.
///
/// The directory is an explicit value handed over at construction; nothing
/// is resolved relative to the executable.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Use `root` as upload directory, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Io(format!("create_dir_all({}): {}", root.display(), e))
        })?;

        tracing::info!(upload_dir = %root.display(), "Local file store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, StorageError> {
        check_file_name(name)?;
        Ok(self.root.join(name))
    }
}

fn io_error(name: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(name.to_string())
    } else {
        StorageError::Io(format!("{name}: {err}"))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(name)?;

        // Written under a hidden temp name, then renamed into place.
        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(file = %name, error = %e, "file_store: write failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(format!("{name}: {e}")));
        }

        tracing::debug!(file = %name, size = data.len(), "file_store: write");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(name)?;
        fs::read(&path).await.map_err(|e| io_error(name, e))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_of(name)?;
        fs::remove_file(&path).await.map_err(|e| io_error(name, e))?;

        tracing::debug!(file = %name, "file_store: delete");
        Ok(())
    }

    async fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path().join("uploads")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, store) = store().await;

        store.write("cat.png", b"meow").await.unwrap();
        assert!(store.exists("cat.png").await);
        assert_eq!(store.read("cat.png").await.unwrap(), b"meow");

        store.delete("cat.png").await.unwrap();
        assert!(!store.exists("cat.png").await);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let (_dir, store) = store().await;

        store.write("cat.png", b"meow").await.unwrap();

        let mut entries = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, vec!["cat.png".to_string()]);
    }

    #[tokio::test]
    async fn test_deleting_missing_file_reports_not_found() {
        let (_dir, store) = store().await;

        let result = store.delete("ghost.png").await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_names_cannot_escape_root() {
        let (_dir, store) = store().await;

        let result = store.write("../escape.png", b"x").await;

        assert!(matches!(result, Err(StorageError::InvalidName(_))));
        assert!(!store.exists("../escape.png").await);
    }
}
