//! In-memory repositories - used when no database is configured.
//!
//! Each operation holds the store lock for its whole duration, which gives
//! the same single-record atomicity the database provides.
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Post, ProfileUpdate, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, UserRepository};

#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken_by_other(store: &HashMap<Uuid, User>, email: &str, id: Uuid) -> bool {
    store.values().any(|u| u.id != id && u.email == email)
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.write().await;
        if store.contains_key(&user.id) {
            return Err(RepoError::Constraint(format!("users.id {}", user.id)));
        }
        if email_taken_by_other(&store, &user.email, user.id) {
            return Err(RepoError::Constraint("users.email".to_string()));
        }
        store.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepoError> {
        let mut store = self.store.write().await;
        if !store.contains_key(&user.id) {
            return Ok(None);
        }
        if email_taken_by_other(&store, &user.email, user.id) {
            return Err(RepoError::Constraint("users.email".to_string()));
        }
        store.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.store.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().find(|u| u.email == email).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepoError> {
        let users: Vec<User> = self.store.read().await.values().cloned().collect();
        Ok(newest_first(users, |u: &User| u.created_at))
    }

    async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, RepoError> {
        let mut store = self.store.write().await;
        Ok(store.get_mut(&id).map(|user| {
            user.avatar = Some(avatar.to_string());
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        let mut store = self.store.write().await;
        if email_taken_by_other(&store, &update.email, id) {
            return Err(RepoError::Constraint("users.email".to_string()));
        }
        Ok(store.get_mut(&id).map(|user| {
            user.username = update.username;
            user.email = update.email;
            user.password_hash = update.password_hash;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn adjust_post_count(&self, id: Uuid, delta: i32) -> Result<(), RepoError> {
        let mut store = self.store.write().await;
        let user = store.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.posts += delta;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPostRepository {
    store: RwLock<HashMap<Uuid, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, keep: impl Fn(&Post) -> bool) -> Vec<Post> {
        let posts: Vec<Post> = self
            .store
            .read()
            .await
            .values()
            .filter(|p| keep(*p))
            .cloned()
            .collect();
        newest_first(posts, |p: &Post| p.created_at)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut store = self.store.write().await;
        if store.contains_key(&post.id) {
            return Err(RepoError::Constraint(format!("posts.id {}", post.id)));
        }
        store.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Option<Post>, RepoError> {
        let mut store = self.store.write().await;
        match store.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.store.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn list_recent(&self) -> Result<Vec<Post>, RepoError> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        Ok(self.select(|p| p.author_id == author_id).await)
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Post>, RepoError> {
        Ok(self.select(|p| p.category == category).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn post_at(author_id: Uuid, category: &str, minutes_ago: i64) -> Post {
        let mut post = Post::new(
            author_id,
            "Title".to_string(),
            category.to_string(),
            "A description that is long enough".to_string(),
            "thumb.png".to_string(),
        );
        post.created_at = Utc::now() - TimeDelta::minutes(minutes_ago);
        post
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_constraint_violation() {
        let repo = InMemoryUserRepository::new();
        repo.insert(User::new("a".into(), "same@example.com", "h".into()))
            .await
            .unwrap();

        let result = repo
            .insert(User::new("b".into(), "same@example.com", "h".into()))
            .await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_adjust_post_count_is_cumulative() {
        let repo = InMemoryUserRepository::new();
        let user = repo
            .insert(User::new("a".into(), "a@example.com", "h".into()))
            .await
            .unwrap();

        repo.adjust_post_count(user.id, 1).await.unwrap();
        repo.adjust_post_count(user.id, 1).await.unwrap();
        repo.adjust_post_count(user.id, -1).await.unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.posts, 1);
        assert!(matches!(
            repo.adjust_post_count(Uuid::new_v4(), 1).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_set_avatar_keeps_counter() {
        let repo = InMemoryUserRepository::new();
        let user = repo
            .insert(User::new("a".into(), "a@example.com", "h".into()))
            .await
            .unwrap();
        repo.adjust_post_count(user.id, 3).await.unwrap();

        let updated = repo.set_avatar(user.id, "me.png").await.unwrap().unwrap();

        assert_eq!(updated.avatar.as_deref(), Some("me.png"));
        assert_eq!(updated.posts, 3);
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        let repo = InMemoryPostRepository::new();
        let author = Uuid::new_v4();
        let old = repo.insert(post_at(author, "tech", 30)).await.unwrap();
        let new = repo.insert(post_at(author, "tech", 1)).await.unwrap();
        repo.insert(post_at(Uuid::new_v4(), "food", 10)).await.unwrap();

        let tech = repo.find_by_category("tech").await.unwrap();
        assert_eq!(
            tech.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![new.id, old.id]
        );

        assert_eq!(repo.find_by_author(author).await.unwrap().len(), 2);
        assert_eq!(repo.list_recent().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_post() {
        let repo = InMemoryPostRepository::new();
        let post = post_at(Uuid::new_v4(), "tech", 0);

        assert!(repo.update(post.clone()).await.unwrap().is_none());
        assert!(!repo.delete(post.id).await.unwrap());
    }
}
