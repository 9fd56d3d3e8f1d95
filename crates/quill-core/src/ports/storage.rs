//! File storage port - where uploaded attachments live.

use async_trait::async_trait;

/// Flat, name-addressed blob store for uploaded attachments.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `data` under `name`. Either the whole file becomes visible or
    /// nothing does.
    async fn write(&self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Read a stored file back.
    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a stored file. Missing files are reported as `NotFound`.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Check whether a file is stored under `name`.
    async fn exists(&self, name: &str) -> bool;
}

/// File storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Reject names that could escape the upload directory.
pub fn check_file_name(name: &str) -> Result<(), StorageError> {
    let escapes = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if escapes {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_are_accepted() {
        assert!(check_file_name("photo3f1c.png").is_ok());
        assert!(check_file_name("avatar").is_ok());
    }

    #[test]
    fn test_traversal_names_are_rejected() {
        for name in ["", ".", "../secret", "a/b.png", "a\\b.png", "x..y"] {
            assert!(
                matches!(check_file_name(name), Err(StorageError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
