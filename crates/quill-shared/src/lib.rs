//! # Quill Shared
//!
//! Request and response bodies of the HTTP API.
//! Kept free of server dependencies so clients can compile it too.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
