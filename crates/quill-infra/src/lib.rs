//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`.
//! This crate contains database, file storage, and authentication integrations.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL repositories via SeaORM
//! - `minimal` - No database driver, in-memory repositories only

pub mod auth;
pub mod database;
pub mod storage;

// Re-exports - In-Memory
pub use database::{DatabaseConnections, InMemoryPostRepository, InMemoryUserRepository};
pub use storage::{InMemoryFileStore, LocalFileStore};

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
