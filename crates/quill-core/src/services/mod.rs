//! Application services - the use cases behind the HTTP handlers.

mod accounts;
mod posts;

pub use accounts::{AccountService, Credentials, DetailsChange, Registration, Session};
pub use posts::{PostDraft, PostService};
