//! Post handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::Post;
use quill_core::services::PostDraft;
use quill_shared::dto::PostResponse;

use super::multipart::Form;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title,
        category: post.category,
        description: post.description,
        thumbnail: post.thumbnail,
        author_id: post.author_id,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

fn post_list(posts: Vec<Post>) -> HttpResponse {
    HttpResponse::Ok().json(posts.into_iter().map(post_response).collect::<Vec<_>>())
}

fn draft_of(form: &Form) -> PostDraft {
    PostDraft {
        title: form.text("title"),
        category: form.text("category"),
        description: form.text("description"),
    }
}

/// POST /api/posts
pub async fn create_post(
    identity: Identity,
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = Form::read(payload, state.max_request_bytes).await?;
    let thumbnail = form.take_file("thumbnail");

    let post = state
        .posts
        .create(identity.user_id, draft_of(&form), thumbnail)
        .await?;

    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// GET /api/posts
pub async fn list_posts(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(post_list(state.posts.list().await?))
}

/// GET /api/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// PATCH /api/posts/{id}
pub async fn edit_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = Form::read(payload, state.max_request_bytes).await?;
    let thumbnail = form.take_file("thumbnail");

    let post = state
        .posts
        .edit(identity.user_id, path.into_inner(), draft_of(&form), thumbnail)
        .await?;

    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(identity.user_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json("Post deleted successfully"))
}

/// GET /api/posts/categories/{category}
pub async fn posts_by_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    Ok(post_list(state.posts.by_category(&path).await?))
}

/// GET /api/posts/users/{id}
pub async fn posts_by_author(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    Ok(post_list(state.posts.by_author(path.into_inner()).await?))
}
