//! Domain entities - the core business objects.

mod user;

mod post;

pub use post::Post;
pub use user::{ProfileUpdate, User, normalize_email};
