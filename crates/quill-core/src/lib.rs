//! # Quill Core
//!
//! The domain layer of the Quill blogging backend.
//! This crate contains business logic and the ports it talks through,
//! with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod workflow;

pub use error::{DomainError, ValidationError};
