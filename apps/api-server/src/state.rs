//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{FileStore, PostRepository, StorageError, TokenService, UserRepository};
use quill_core::services::{AccountService, PostService};
use quill_core::workflow::{AttachmentStore, UploadPolicy};
use quill_infra::database::{DatabaseConfig, DatabaseConnections};
use quill_infra::{
    Argon2PasswordService, InMemoryPostRepository, InMemoryUserRepository, JwtTokenService,
    LocalFileStore,
};

#[cfg(feature = "postgres")]
use quill_infra::database::{PostgresPostRepository, PostgresUserRepository};

use crate::config::{AppConfig, UploadConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostService>,
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<dyn TokenService>,
    pub db: Option<Arc<DatabaseConnections>>,
    /// Cap on a whole multipart body, in bytes.
    pub max_request_bytes: usize,
}

type Repositories = (
    Option<Arc<DatabaseConnections>>,
    Arc<dyn UserRepository>,
    Arc<dyn PostRepository>,
);

fn in_memory() -> Repositories {
    (
        None,
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemoryPostRepository::new()),
    )
}

#[cfg(feature = "postgres")]
async fn repositories(db_config: Option<&DatabaseConfig>) -> Repositories {
    let Some(config) = db_config else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return in_memory();
    };

    match DatabaseConnections::init(config).await {
        Ok(connections) => {
            let users: Arc<dyn UserRepository> =
                Arc::new(PostgresUserRepository::new(Arc::clone(&connections.main)));
            let posts: Arc<dyn PostRepository> =
                Arc::new(PostgresPostRepository::new(Arc::clone(&connections.main)));
            (Some(Arc::new(connections)), users, posts)
        }
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            in_memory()
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn repositories(_db_config: Option<&DatabaseConfig>) -> Repositories {
    tracing::info!("Running without postgres feature - using in-memory repositories");
    in_memory()
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StorageError> {
        let (db, users, posts) = repositories(config.database.as_ref()).await;
        let files = Arc::new(LocalFileStore::open(config.uploads.dir.clone()).await?);
        let tokens = Arc::new(JwtTokenService::new(config.jwt.clone()));

        let state = Self::assemble(users, posts, files, tokens, &config.uploads).with_db(db);
        tracing::info!("Application state initialized");
        Ok(state)
    }

    /// Wire the services over the given backends.
    pub fn assemble(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        files: Arc<dyn FileStore>,
        tokens: Arc<dyn TokenService>,
        uploads: &UploadConfig,
    ) -> Self {
        let attachments = AttachmentStore::new(files);

        let post_service = PostService::new(
            posts,
            users.clone(),
            attachments.clone(),
            UploadPolicy::thumbnail(uploads.thumbnail_max_bytes),
        );
        let account_service = AccountService::new(
            users,
            Arc::new(Argon2PasswordService::new()),
            tokens.clone(),
            attachments,
            UploadPolicy::avatar(uploads.avatar_max_bytes),
        );

        Self {
            posts: Arc::new(post_service),
            accounts: Arc::new(account_service),
            tokens,
            db: None,
            max_request_bytes: uploads.max_request_bytes,
        }
    }

    fn with_db(mut self, db: Option<Arc<DatabaseConnections>>) -> Self {
        self.db = db;
        self
    }
}
