//! In-memory file store - used by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::ports::{FileStore, StorageError, check_file_name};

/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every stored file, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        check_file_name(name)?;
        self.files
            .write()
            .await
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        check_file_name(name)?;
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        check_file_name(name)?;
        self.files
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> bool {
        check_file_name(name).is_ok() && self.files.read().await.contains_key(name)
    }
}
