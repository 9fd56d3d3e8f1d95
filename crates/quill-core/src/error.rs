//! Domain-level error types.

use thiserror::Error;

use crate::ports::{AuthError, StorageError};

/// Client-correctable input problem, carrying the HTTP-style status the
/// caller should answer with (400 or 422).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub status: u16,
}

impl ValidationError {
    /// 400 - the request is malformed.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 400,
        }
    }

    /// 422 - the request is well-formed but its content is unacceptable.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 422,
        }
    }
}

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
