//! Workflows combining file storage and persistence.

mod attachment;
mod saga;
pub mod upload;
pub mod validate;

pub use attachment::{AttachmentStore, CreateStep, DeleteStep, ReplaceStep};
pub use saga::Saga;
pub use upload::{Upload, UploadPolicy, unique_file_name};
