//! File stores - local upload directory and in-memory fallback.

mod local;
mod memory;

pub use local::LocalFileStore;
pub use memory::InMemoryFileStore;
