//! User accounts: registration, login, profile details and avatars.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{ProfileUpdate, User, normalize_email};
use crate::error::{DomainError, RepoError, ValidationError};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};
use crate::workflow::validate::{PASSWORD_MIN_CHARS, has_min_chars, require_all};
use crate::workflow::{AttachmentStore, ReplaceStep, Saga, Upload, UploadPolicy};

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct DetailsChange {
    pub username: String,
    pub email: String,
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

/// Issued on successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    attachments: AttachmentStore,
    avatar: UploadPolicy,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        attachments: AttachmentStore,
        avatar: UploadPolicy,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
            attachments,
            avatar,
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        let Registration {
            username,
            email,
            password,
            password_confirmation,
        } = registration;

        require_all(&[username.as_str(), email.as_str(), password.as_str()], || {
            ValidationError::bad_request("Fill in all the fields")
        })?;

        let email = normalize_email(&email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(email_taken());
        }
        if !has_min_chars(password.trim(), PASSWORD_MIN_CHARS) {
            return Err(ValidationError::bad_request(
                "Password should contain at least 8 characters",
            )
            .into());
        }
        if password != password_confirmation {
            return Err(ValidationError::bad_request("Passwords do not match").into());
        }

        let password_hash = self.passwords.hash(&password)?;
        let user = User::new(username.trim().to_string(), &email, password_hash);

        // The unique index settles concurrent registrations for one address.
        let user = self.users.insert(user).await.map_err(conflict_on_email)?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session, DomainError> {
        require_all(&[credentials.email.as_str(), credentials.password.as_str()], || {
            ValidationError::unprocessable("Please provide both email and password")
        })?;

        let user = self
            .users
            .find_by_email(&normalize_email(&credentials.email))
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if !self
            .passwords
            .verify(&credentials.password, &user.password_hash)?
        {
            return Err(AuthError::InvalidCredentials("Invalid password".to_string()).into());
        }

        let token = self.tokens.generate_token(user.id, &user.username)?;
        tracing::debug!(user_id = %user.id, "Login succeeded");

        Ok(Session {
            token,
            user_id: user.id,
            username: user.username,
        })
    }

    pub async fn authors(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.users.list_all().await?)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    /// Store a new avatar, point the user at it and drop the previous file.
    pub async fn change_avatar(
        &self,
        user_id: Uuid,
        avatar: Option<Upload>,
    ) -> Result<User, DomainError> {
        let mut saga = Saga::begin("change_avatar", ReplaceStep::Validating);

        let upload = self.avatar.check(avatar.as_ref())?;
        let user = self.get(user_id).await?;

        let new_name = self
            .attachments
            .stage(&mut saga, ReplaceStep::WritingNewFile, upload)
            .await?;

        let updated = saga
            .run(ReplaceStep::PersistingEntity, async {
                self.users
                    .set_avatar(user.id, &new_name)
                    .await?
                    .ok_or_else(|| DomainError::Internal("Avatar cannot be changed".to_string()))
            })
            .await?;

        if let Some(old_name) = user.avatar.as_deref() {
            saga.advance(ReplaceStep::DeletingOldFile);
            self.attachments.discard(old_name).await;
        }

        saga.complete(ReplaceStep::Done);
        tracing::info!(%user_id, "Avatar changed");
        Ok(updated)
    }

    pub async fn update_details(
        &self,
        user_id: Uuid,
        change: DetailsChange,
    ) -> Result<User, DomainError> {
        require_all(
            &[
                change.username.as_str(),
                change.email.as_str(),
                change.current_password.as_str(),
                change.new_password.as_str(),
                change.new_password_confirmation.as_str(),
            ],
            || ValidationError::unprocessable("Fill in all the fields"),
        )?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::Forbidden("User not found".to_string()))?;

        let email = normalize_email(&change.email);
        let owner = self.users.find_by_email(&email).await?;
        if owner.is_some_and(|other| other.id != user.id) {
            return Err(email_taken());
        }

        if !self
            .passwords
            .verify(&change.current_password, &user.password_hash)?
        {
            return Err(ValidationError::unprocessable("Invalid current password").into());
        }
        if !has_min_chars(&change.new_password, PASSWORD_MIN_CHARS) {
            return Err(ValidationError::unprocessable(
                "Password must contain at least 8 characters",
            )
            .into());
        }
        if change.new_password != change.new_password_confirmation {
            return Err(ValidationError::unprocessable("Passwords do not match").into());
        }

        let update = ProfileUpdate {
            username: change.username.trim().to_string(),
            email,
            password_hash: self.passwords.hash(&change.new_password)?,
        };

        let updated = self
            .users
            .update_profile(user.id, update)
            .await
            .map_err(conflict_on_email)?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        tracing::info!(%user_id, "User details updated");
        Ok(updated)
    }
}

fn email_taken() -> DomainError {
    DomainError::Conflict("Email already exists".to_string())
}

fn conflict_on_email(err: RepoError) -> DomainError {
    match err {
        RepoError::Constraint(_) => email_taken(),
        other => other.into(),
    }
}
