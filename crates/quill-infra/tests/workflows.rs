//! End-to-end checks of the post and account workflows over the in-memory
//! repositories and a real upload directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::DomainError;
use quill_core::domain::{Post, ProfileUpdate, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, FileStore, PostRepository, TokenService, UserRepository,
};
use quill_core::services::{
    AccountService, Credentials, DetailsChange, PostDraft, PostService, Registration,
};
use quill_core::workflow::upload::{AVATAR_MAX_BYTES, THUMBNAIL_MAX_BYTES};
use quill_core::workflow::{AttachmentStore, Upload, UploadPolicy};
use quill_infra::{
    Argon2PasswordService, InMemoryPostRepository, InMemoryUserRepository, JwtConfig,
    JwtTokenService, LocalFileStore,
};

fn outage() -> RepoError {
    RepoError::Connection("database unavailable".to_string())
}

/// Post repository that fails one kind of write.
#[derive(Default)]
struct RejectingPosts {
    inner: InMemoryPostRepository,
    reject_updates: bool,
}

impl RejectingPosts {
    fn inserts() -> Self {
        Self::default()
    }

    fn updates() -> Self {
        Self {
            reject_updates: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for RejectingPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        if self.reject_updates {
            self.inner.insert(post).await
        } else {
            Err(outage())
        }
    }

    async fn update(&self, post: Post) -> Result<Option<Post>, RepoError> {
        if self.reject_updates {
            Err(outage())
        } else {
            self.inner.update(post).await
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl PostRepository for RejectingPosts {
    async fn list_recent(&self) -> Result<Vec<Post>, RepoError> {
        self.inner.list_recent().await
    }

    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        self.inner.find_by_author(author_id).await
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Post>, RepoError> {
        self.inner.find_by_category(category).await
    }
}

/// User repository whose counter or avatar writes can be switched off.
#[derive(Default)]
struct FaultyUsers {
    inner: InMemoryUserRepository,
    counter_frozen: AtomicBool,
    avatars_rejected: AtomicBool,
}

impl FaultyUsers {
    fn frozen_counter() -> Self {
        let users = Self::default();
        users.freeze_counter();
        users
    }

    fn freeze_counter(&self) {
        self.counter_frozen.store(true, Ordering::SeqCst);
    }

    fn reject_avatars(&self) {
        self.avatars_rejected.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for FaultyUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        self.inner.insert(user).await
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepoError> {
        self.inner.update(user).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl UserRepository for FaultyUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.inner.find_by_email(email).await
    }

    async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        self.inner.list_all().await
    }

    async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, RepoError> {
        if self.avatars_rejected.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.inner.set_avatar(id, avatar).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        self.inner.update_profile(id, update).await
    }

    async fn adjust_post_count(&self, id: Uuid, delta: i32) -> Result<(), RepoError> {
        if self.counter_frozen.load(Ordering::SeqCst) {
            return Err(RepoError::Query("counter update failed".to_string()));
        }
        self.inner.adjust_post_count(id, delta).await
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    files: Arc<LocalFileStore>,
    users: Arc<dyn UserRepository>,
    posts: PostService,
    accounts: AccountService,
    tokens: Arc<JwtTokenService>,
}

async fn harness_with(
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let files = Arc::new(LocalFileStore::open(dir.path()).await.unwrap());
    let attachments = AttachmentStore::new(files.clone());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        ..JwtConfig::default()
    }));

    let post_service = PostService::new(
        posts,
        users.clone(),
        attachments.clone(),
        UploadPolicy::thumbnail(THUMBNAIL_MAX_BYTES),
    );
    let accounts = AccountService::new(
        users.clone(),
        Arc::new(Argon2PasswordService::new()),
        tokens.clone(),
        attachments,
        UploadPolicy::avatar(AVATAR_MAX_BYTES),
    );

    Harness {
        _dir: dir,
        files,
        users,
        posts: post_service,
        accounts,
        tokens,
    }
}

async fn harness() -> Harness {
    harness_with(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemoryPostRepository::new()),
    )
    .await
}

fn registration(email: &str) -> Registration {
    Registration {
        username: "Ada".to_string(),
        email: email.to_string(),
        password: "correct horse".to_string(),
        password_confirmation: "correct horse".to_string(),
    }
}

fn draft() -> PostDraft {
    PostDraft {
        title: "First light".to_string(),
        category: "Art".to_string(),
        description: "Notes from the first morning".to_string(),
    }
}

fn image(size: usize) -> Upload {
    Upload::new("sunrise.png", vec![7u8; size])
}

impl Harness {
    async fn author(&self) -> User {
        self.accounts
            .register(registration("ada@example.com"))
            .await
            .unwrap()
    }

    async fn post_count(&self, user_id: Uuid) -> i32 {
        self.users.find_by_id(user_id).await.unwrap().unwrap().posts
    }

    async fn stored_files(&self) -> usize {
        std::fs::read_dir(self.files.root()).unwrap().count()
    }
}

#[tokio::test]
async fn test_create_and_delete_post_keeps_files_and_counter_in_step() {
    let h = harness().await;
    let author = h.author().await;

    let post = h
        .posts
        .create(author.id, draft(), Some(image(1_999_999)))
        .await
        .unwrap();

    assert!(post.thumbnail.starts_with("sunrise"));
    assert!(post.thumbnail.ends_with(".png"));
    assert_ne!(post.thumbnail, "sunrise.png");
    assert!(h.files.exists(&post.thumbnail).await);
    assert_eq!(h.post_count(author.id).await, 1);

    h.posts.delete(author.id, post.id).await.unwrap();

    assert!(!h.files.exists(&post.thumbnail).await);
    assert_eq!(h.post_count(author.id).await, 0);
    assert!(matches!(
        h.posts.get(post.id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_long_client_file_name_is_stored() {
    let h = harness().await;
    let author = h.author().await;
    let upload = Upload::new(format!("{}.png", "a".repeat(240)), vec![7u8; 10]);

    let post = h
        .posts
        .create(author.id, draft(), Some(upload))
        .await
        .unwrap();

    assert!(post.thumbnail.len() <= 255);
    assert!(post.thumbnail.ends_with(".png"));
    assert!(h.files.exists(&post.thumbnail).await);
}

#[tokio::test]
async fn test_oversized_thumbnail_leaves_nothing_behind() {
    let h = harness().await;
    let author = h.author().await;

    let err = h
        .posts
        .create(author.id, draft(), Some(image(2_000_001)))
        .await
        .unwrap_err();

    match err {
        DomainError::Validation(v) => {
            assert_eq!(v.status, 422);
            assert_eq!(v.message, "Image too big. It should be less than 2 MB.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.stored_files().await, 0);
    assert!(h.posts.list().await.unwrap().is_empty());
    assert_eq!(h.post_count(author.id).await, 0);
}

#[tokio::test]
async fn test_short_description_is_rejected_before_any_write() {
    let h = harness().await;
    let author = h.author().await;

    let mut short = draft();
    short.description = "Too short".to_string();
    let err = h
        .posts
        .create(author.id, short, Some(image(10)))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Validation(v) if v.status == 422));
    assert_eq!(h.stored_files().await, 0);
}

#[tokio::test]
async fn test_failed_insert_removes_written_thumbnail() {
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let h = harness_with(users, Arc::new(RejectingPosts::inserts())).await;
    let author = h.author().await;

    let result = h
        .posts
        .create(author.id, draft(), Some(image(64)))
        .await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.stored_files().await, 0);
    assert_eq!(h.post_count(author.id).await, 0);
}

#[tokio::test]
async fn test_failed_counter_update_rolls_back_post_and_file() {
    let h = harness_with(
        Arc::new(FaultyUsers::frozen_counter()),
        Arc::new(InMemoryPostRepository::new()),
    )
    .await;
    let author = h.author().await;

    let result = h
        .posts
        .create(author.id, draft(), Some(image(64)))
        .await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.stored_files().await, 0);
    assert!(h.posts.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_counter_update_on_delete_restores_post_and_file() {
    let users = Arc::new(FaultyUsers::default());
    let h = harness_with(users.clone(), Arc::new(InMemoryPostRepository::new())).await;
    let author = h.author().await;
    let post = h
        .posts
        .create(author.id, draft(), Some(image(48)))
        .await
        .unwrap();

    users.freeze_counter();
    let result = h.posts.delete(author.id, post.id).await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.files.read(&post.thumbnail).await.unwrap(), vec![7u8; 48]);
    assert_eq!(h.stored_files().await, 1);
    let restored = h.posts.get(post.id).await.unwrap();
    assert_eq!(restored.thumbnail, post.thumbnail);
    assert_eq!(h.post_count(author.id).await, 1);
}

#[tokio::test]
async fn test_failed_edit_keeps_old_thumbnail_and_drops_new_one() {
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let h = harness_with(users, Arc::new(RejectingPosts::updates())).await;
    let author = h.author().await;
    let post = h
        .posts
        .create(author.id, draft(), Some(image(32)))
        .await
        .unwrap();

    let result = h
        .posts
        .edit(
            author.id,
            post.id,
            draft(),
            Some(Upload::new("dusk.jpg", vec![1u8; 16])),
        )
        .await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.stored_files().await, 1);
    assert_eq!(h.files.read(&post.thumbnail).await.unwrap(), vec![7u8; 32]);
    assert_eq!(h.posts.get(post.id).await.unwrap().thumbnail, post.thumbnail);
}

#[tokio::test]
async fn test_failed_avatar_update_keeps_old_avatar_and_drops_new_one() {
    let users = Arc::new(FaultyUsers::default());
    let h = harness_with(users.clone(), Arc::new(InMemoryPostRepository::new())).await;
    let author = h.author().await;
    let first = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![1u8; 100])))
        .await
        .unwrap();
    let first_name = first.avatar.unwrap();

    users.reject_avatars();
    let result = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![2u8; 100])))
        .await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.stored_files().await, 1);
    assert_eq!(h.files.read(&first_name).await.unwrap(), vec![1u8; 100]);
    let user = h.users.find_by_id(author.id).await.unwrap().unwrap();
    assert_eq!(user.avatar.as_deref(), Some(first_name.as_str()));
}

#[tokio::test]
async fn test_deleting_post_with_missing_thumbnail_succeeds() {
    let h = harness().await;
    let author = h.author().await;
    let post = h
        .posts
        .create(author.id, draft(), Some(image(32)))
        .await
        .unwrap();

    h.files.delete(&post.thumbnail).await.unwrap();

    h.posts.delete(author.id, post.id).await.unwrap();
    assert!(matches!(
        h.posts.get(post.id).await,
        Err(DomainError::NotFound(_))
    ));
    assert_eq!(h.post_count(author.id).await, 0);
}

#[tokio::test]
async fn test_only_the_author_may_delete() {
    let h = harness().await;
    let author = h.author().await;
    let other = h
        .accounts
        .register(registration("grace@example.com"))
        .await
        .unwrap();
    let post = h
        .posts
        .create(author.id, draft(), Some(image(32)))
        .await
        .unwrap();

    let err = h.posts.delete(other.id, post.id).await.unwrap_err();

    assert!(matches!(err, DomainError::Forbidden(_)));
    assert!(h.files.exists(&post.thumbnail).await);
    assert_eq!(h.post_count(author.id).await, 1);
}

#[tokio::test]
async fn test_edit_with_new_thumbnail_replaces_file() {
    let h = harness().await;
    let author = h.author().await;
    let post = h
        .posts
        .create(author.id, draft(), Some(image(32)))
        .await
        .unwrap();

    let mut change = draft();
    change.title = "Second light".to_string();
    let edited = h
        .posts
        .edit(
            author.id,
            post.id,
            change,
            Some(Upload::new("dusk.jpg", vec![1u8; 16])),
        )
        .await
        .unwrap();

    assert_eq!(edited.title, "Second light");
    assert!(edited.thumbnail.starts_with("dusk"));
    assert!(h.files.exists(&edited.thumbnail).await);
    assert!(!h.files.exists(&post.thumbnail).await);
    assert_eq!(h.stored_files().await, 1);
}

#[tokio::test]
async fn test_edit_by_someone_else_is_not_found() {
    let h = harness().await;
    let author = h.author().await;
    let post = h
        .posts
        .create(author.id, draft(), Some(image(32)))
        .await
        .unwrap();

    let err = h
        .posts
        .edit(Uuid::new_v4(), post.id, draft(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_category_listing_is_newest_first_and_empty_is_not_found() {
    let h = harness().await;
    let author = h.author().await;
    let older = h
        .posts
        .create(author.id, draft(), Some(image(8)))
        .await
        .unwrap();
    let newer = h
        .posts
        .create(author.id, draft(), Some(image(8)))
        .await
        .unwrap();

    let listed = h.posts.by_category("Art").await.unwrap();
    assert_eq!(
        listed.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );
    assert_eq!(h.post_count(author.id).await, 2);

    assert!(matches!(
        h.posts.by_category("Nothing").await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let h = harness().await;
    h.author().await;

    let err = h
        .accounts
        .register(registration("  ADA@example.com "))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn test_login_issues_token_for_the_user() {
    let h = harness().await;
    let author = h.author().await;

    let session = h
        .accounts
        .login(Credentials {
            email: "Ada@Example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.user_id, author.id);
    let claims = h.tokens.validate_token(&session.token).unwrap();
    assert_eq!(claims.user_id, author.id);
    assert_eq!(claims.username, "Ada");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let h = harness().await;
    h.author().await;

    let err = h
        .accounts
        .login(Credentials {
            email: "ada@example.com".to_string(),
            password: "wrong horse".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Auth(_)));
}

#[tokio::test]
async fn test_avatar_replacement_removes_previous_file() {
    let h = harness().await;
    let author = h.author().await;

    let first = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![1u8; 100])))
        .await
        .unwrap();
    let first_name = first.avatar.clone().unwrap();
    assert!(h.files.exists(&first_name).await);

    let second = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![2u8; 100])))
        .await
        .unwrap();
    let second_name = second.avatar.clone().unwrap();

    assert_ne!(first_name, second_name);
    assert!(!h.files.exists(&first_name).await);
    assert!(h.files.exists(&second_name).await);
}

#[tokio::test]
async fn test_avatar_replacement_tolerates_missing_old_file() {
    let h = harness().await;
    let author = h.author().await;
    let first = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![1u8; 100])))
        .await
        .unwrap();
    h.files.delete(first.avatar.as_deref().unwrap()).await.unwrap();

    let second = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![2u8; 100])))
        .await
        .unwrap();

    assert!(h.files.exists(second.avatar.as_deref().unwrap()).await);
}

#[tokio::test]
async fn test_oversized_avatar_is_rejected() {
    let h = harness().await;
    let author = h.author().await;

    let err = h
        .accounts
        .change_avatar(author.id, Some(Upload::new("me.png", vec![0u8; 500_001])))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::Validation(v)
            if v.message == "Profile picture is too big. It should be less than 500 KB."
    ));
    assert_eq!(h.stored_files().await, 0);
}

#[tokio::test]
async fn test_update_details_keeps_post_counter() {
    let h = harness().await;
    let author = h.author().await;
    h.posts
        .create(author.id, draft(), Some(image(8)))
        .await
        .unwrap();

    let updated = h
        .accounts
        .update_details(
            author.id,
            DetailsChange {
                username: "Ada L".to_string(),
                email: "ada@example.com".to_string(),
                current_password: "correct horse".to_string(),
                new_password: "battery staple".to_string(),
                new_password_confirmation: "battery staple".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.username, "Ada L");
    assert_eq!(updated.posts, 1);
    assert!(
        h.accounts
            .login(Credentials {
                email: "ada@example.com".to_string(),
                password: "battery staple".to_string(),
            })
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_details_to_taken_email_is_a_conflict() {
    let h = harness().await;
    let author = h.author().await;
    h.accounts
        .register(registration("grace@example.com"))
        .await
        .unwrap();

    let err = h
        .accounts
        .update_details(
            author.id,
            DetailsChange {
                username: "Ada".to_string(),
                email: "grace@example.com".to_string(),
                current_password: "correct horse".to_string(),
                new_password: "battery staple".to_string(),
                new_password_confirmation: "battery staple".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Conflict(_)));
}
