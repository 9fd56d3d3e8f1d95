//! Upload-mutate-persist workflows for entities carrying one attachment.
//!
//! The three shapes, each driven by a [`Saga`]:
//!
//! - create: `Validating → WritingFile → PersistingEntity → UpdatingOwnerCounter → Done`
//! - replace: `Validating → WritingNewFile → PersistingEntity → DeletingOldFile → Done`
//! - delete: `LocatingEntity → DeletingFile → DeletingEntity → UpdatingOwnerCounter → Done`
//!
//! [`AttachmentStore`] provides the file-side steps together with their
//! compensations; the services supply the persistence steps.

use std::sync::Arc;

use crate::error::DomainError;
use crate::ports::{FileStore, StorageError};

use super::saga::Saga;
use super::upload::{Upload, unique_file_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    Validating,
    WritingFile,
    PersistingEntity,
    UpdatingOwnerCounter,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStep {
    Validating,
    WritingNewFile,
    PersistingEntity,
    DeletingOldFile,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    LocatingEntity,
    DeletingFile,
    DeletingEntity,
    UpdatingOwnerCounter,
    Done,
}

/// File-side steps of the attachment workflows.
#[derive(Clone)]
pub struct AttachmentStore {
    files: Arc<dyn FileStore>,
}

impl AttachmentStore {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    /// Write `upload` under a fresh unique name as step `step`.
    ///
    /// On success the saga learns to delete the file again if a later step
    /// fails.
    pub async fn stage<S>(
        &self,
        saga: &mut Saga<'_, S>,
        step: S,
        upload: &Upload,
    ) -> Result<String, DomainError>
    where
        S: Copy + std::fmt::Debug + PartialEq,
    {
        let name = unique_file_name(&upload.file_name);
        saga.run(step, self.files.write(&name, &upload.data)).await?;

        tracing::debug!(file = %name, size = upload.size(), "Attachment stored");

        let files = Arc::clone(&self.files);
        let staged = name.clone();
        saga.compensate_with(async move {
            if let Err(e) = files.delete(&staged).await {
                tracing::error!(file = %staged, error = %e, "Failed to remove orphaned attachment");
            }
        });

        Ok(name)
    }

    /// Remove a file that is no longer referenced. Never fails the caller.
    pub async fn discard(&self, name: &str) {
        match self.files.delete(name).await {
            Ok(()) => tracing::debug!(file = %name, "Replaced attachment removed"),
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(file = %name, "Replaced attachment was already missing")
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Could not remove replaced attachment")
            }
        }
    }

    /// Remove the file of an entity being deleted, as step `step`.
    ///
    /// The bytes are kept so a rollback can put the file back. A file that
    /// is already gone from disk does not block the deletion.
    pub async fn take<S>(
        &self,
        saga: &mut Saga<'_, S>,
        step: S,
        name: &str,
    ) -> Result<(), DomainError>
    where
        S: Copy + std::fmt::Debug + PartialEq,
    {
        saga.advance(step);

        let stash = match self.files.read(name).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(file = %name, "Attachment already missing, continuing");
                return Ok(());
            }
            Err(e) => {
                saga.rollback(&e.to_string()).await;
                return Err(e.into());
            }
        };

        match self.files.delete(name).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => {
                saga.rollback(&e.to_string()).await;
                return Err(e.into());
            }
        }

        let files = Arc::clone(&self.files);
        let restored = name.to_string();
        saga.compensate_with(async move {
            if let Err(e) = files.write(&restored, &stash).await {
                tracing::error!(file = %restored, error = %e, "Failed to restore attachment");
            }
        });

        Ok(())
    }
}
