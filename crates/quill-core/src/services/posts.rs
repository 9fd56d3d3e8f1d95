//! Post management: creation, edits and deletion with thumbnail handling,
//! plus the read-side listings.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::Post;
use crate::error::{DomainError, ValidationError};
use crate::ports::{PostRepository, UserRepository};
use crate::workflow::validate::{DESCRIPTION_MIN_CHARS, has_min_chars, require_all};
use crate::workflow::{
    AttachmentStore, CreateStep, DeleteStep, ReplaceStep, Saga, Upload, UploadPolicy,
};

/// Text fields of a post as submitted by its author.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub category: String,
    pub description: String,
}

impl PostDraft {
    fn fields(&self) -> [&str; 3] {
        [&self.title, &self.category, &self.description]
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    attachments: AttachmentStore,
    thumbnail: UploadPolicy,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        attachments: AttachmentStore,
        thumbnail: UploadPolicy,
    ) -> Self {
        Self {
            posts,
            users,
            attachments,
            thumbnail,
        }
    }

    /// Create a post with its thumbnail and bump the author's post count.
    pub async fn create(
        &self,
        author_id: Uuid,
        draft: PostDraft,
        thumbnail: Option<Upload>,
    ) -> Result<Post, DomainError> {
        let mut saga = Saga::begin("create_post", CreateStep::Validating);

        require_all(&draft.fields(), || {
            ValidationError::unprocessable("Fill in all the fields and upload a file")
        })?;
        if !has_min_chars(draft.description.trim(), DESCRIPTION_MIN_CHARS) {
            return Err(ValidationError::unprocessable(
                "Description should be at least 12 characters long",
            )
            .into());
        }
        let upload = self.thumbnail.check(thumbnail.as_ref())?;

        let file_name = self
            .attachments
            .stage(&mut saga, CreateStep::WritingFile, upload)
            .await?;

        let post = Post::new(
            author_id,
            draft.title.trim().to_string(),
            draft.category.trim().to_string(),
            draft.description,
            file_name,
        );
        let post = saga
            .run(CreateStep::PersistingEntity, self.posts.insert(post))
            .await?;

        let posts = Arc::clone(&self.posts);
        let post_id = post.id;
        saga.compensate_with(async move {
            if let Err(e) = posts.delete(post_id).await {
                tracing::error!(%post_id, error = %e, "Failed to remove post during rollback");
            }
        });

        saga.run(
            CreateStep::UpdatingOwnerCounter,
            self.users.adjust_post_count(author_id, 1),
        )
        .await?;

        saga.complete(CreateStep::Done);
        tracing::info!(post_id = %post.id, %author_id, "Post created");
        Ok(post)
    }

    /// Edit the text of a post, optionally swapping its thumbnail.
    pub async fn edit(
        &self,
        editor_id: Uuid,
        post_id: Uuid,
        draft: PostDraft,
        thumbnail: Option<Upload>,
    ) -> Result<Post, DomainError> {
        let mut saga = Saga::begin("edit_post", ReplaceStep::Validating);

        let invalid = || {
            ValidationError::unprocessable(
                "Fill in all the fields and ensure description is at least 12 characters long",
            )
        };
        require_all(&draft.fields(), invalid)?;
        if !has_min_chars(draft.description.trim(), DESCRIPTION_MIN_CHARS) {
            return Err(invalid().into());
        }
        let upload = match thumbnail.as_ref() {
            Some(t) => Some(self.thumbnail.check(Some(t))?),
            None => None,
        };

        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .filter(|p| p.is_authored_by(editor_id))
            .ok_or_else(|| {
                DomainError::not_found("Post not found or you do not have permission to edit it")
            })?;

        post.title = draft.title.trim().to_string();
        post.category = draft.category.trim().to_string();
        post.description = draft.description;
        post.updated_at = Utc::now();

        let Some(upload) = upload else {
            return self.persist_edit(post).await;
        };

        let new_name = self
            .attachments
            .stage(&mut saga, ReplaceStep::WritingNewFile, upload)
            .await?;
        let old_name = std::mem::replace(&mut post.thumbnail, new_name);

        let updated = saga
            .run(ReplaceStep::PersistingEntity, self.persist_edit(post))
            .await?;

        saga.advance(ReplaceStep::DeletingOldFile);
        self.attachments.discard(&old_name).await;

        saga.complete(ReplaceStep::Done);
        tracing::info!(%post_id, "Post edited with new thumbnail");
        Ok(updated)
    }

    async fn persist_edit(&self, post: Post) -> Result<Post, DomainError> {
        self.posts
            .update(post)
            .await?
            .ok_or_else(|| DomainError::Internal("Could not update post".to_string()))
    }

    /// Delete a post and its thumbnail, then decrement the author's count.
    pub async fn delete(&self, requester_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        let mut saga = Saga::begin("delete_post", DeleteStep::LocatingEntity);

        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post not found"))?;
        if !post.is_authored_by(requester_id) {
            return Err(DomainError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        self.attachments
            .take(&mut saga, DeleteStep::DeletingFile, &post.thumbnail)
            .await?;

        let removed = saga
            .run(DeleteStep::DeletingEntity, self.posts.delete(post.id))
            .await?;
        if !removed {
            saga.rollback("post disappeared before it could be deleted").await;
            return Err(DomainError::not_found("Post not found"));
        }

        let posts = Arc::clone(&self.posts);
        let snapshot = post.clone();
        saga.compensate_with(async move {
            let id = snapshot.id;
            if let Err(e) = posts.insert(snapshot).await {
                tracing::error!(post_id = %id, error = %e, "Failed to restore post during rollback");
            }
        });

        saga.run(
            DeleteStep::UpdatingOwnerCounter,
            self.users.adjust_post_count(post.author_id, -1),
        )
        .await?;

        saga.complete(DeleteStep::Done);
        tracing::info!(%post_id, "Post deleted");
        Ok(())
    }

    pub async fn get(&self, post_id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post not found"))
    }

    pub async fn list(&self) -> Result<Vec<Post>, DomainError> {
        Ok(self.posts.list_recent().await?)
    }

    pub async fn by_author(&self, author_id: Uuid) -> Result<Vec<Post>, DomainError> {
        Ok(self.posts.find_by_author(author_id).await?)
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<Post>, DomainError> {
        let posts = self.posts.find_by_category(category).await?;
        if posts.is_empty() {
            return Err(DomainError::not_found("Posts not found in this category"));
        }
        Ok(posts)
    }
}
