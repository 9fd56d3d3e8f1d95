use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Post, ProfileUpdate, User};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
///
/// Every call is an atomic single-record operation; nothing here spans
/// several records.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Unique violations surface as `RepoError::Constraint`.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Replace an existing entity. Returns `None` when no record has that ID.
    async fn update(&self, entity: T) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID. Returns whether a record was removed.
    async fn delete(&self, id: ID) -> Result<bool, RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their (already normalized) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// All users, newest first.
    async fn list_all(&self) -> Result<Vec<User>, RepoError>;

    /// Point the avatar reference at a new stored file.
    async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, RepoError>;

    /// Replace username, email and password hash, leaving the rest untouched.
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError>;

    /// Atomically apply `posts = posts + delta`.
    async fn adjust_post_count(&self, id: Uuid, delta: i32) -> Result<(), RepoError>;
}

/// Post repository. Every listing is ordered newest first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn list_recent(&self) -> Result<Vec<Post>, RepoError>;

    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError>;

    async fn find_by_category(&self, category: &str) -> Result<Vec<Post>, RepoError>;
}
