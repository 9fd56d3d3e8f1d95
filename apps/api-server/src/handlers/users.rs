//! User account handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::User;
use quill_core::services::{Credentials, DetailsChange, Registration};
use quill_shared::dto::{
    LoginRequest, LoginResponse, RegisterUserRequest, UpdateUserRequest, UserResponse,
};

use super::multipart::Form;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        avatar: user.avatar,
        posts: user.posts,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

/// POST /api/users/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .accounts
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            password_confirmation: req.password2,
        })
        .await?;

    Ok(HttpResponse::Created().json(user_response(user)))
}

/// POST /api/users/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let session = state
        .accounts
        .login(Credentials {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: session.token,
        id: session.user_id,
        username: session.username,
    }))
}

/// GET /api/users
pub async fn list_authors(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let users = state.accounts.authors().await?;
    Ok(HttpResponse::Ok().json(users.into_iter().map(user_response).collect::<Vec<_>>()))
}

/// GET /api/users/{id}
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user = state.accounts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user_response(user)))
}

/// POST /api/users/change-avatar
pub async fn change_avatar(
    identity: Identity,
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = Form::read(payload, state.max_request_bytes).await?;

    let user = state
        .accounts
        .change_avatar(identity.user_id, form.take_file("avatar"))
        .await?;

    Ok(HttpResponse::Ok().json(user_response(user)))
}

/// PATCH /api/users/edit-user
pub async fn edit_user(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<UpdateUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .accounts
        .update_details(
            identity.user_id,
            DetailsChange {
                username: req.username,
                email: req.email,
                current_password: req.current_password,
                new_password: req.new_password,
                new_password_confirmation: req.new_confirm_password,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(user_response(user)))
}
