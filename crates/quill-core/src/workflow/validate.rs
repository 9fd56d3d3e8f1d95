//! Text field checks shared by the services.

use crate::error::ValidationError;

pub const DESCRIPTION_MIN_CHARS: usize = 12;
pub const PASSWORD_MIN_CHARS: usize = 8;

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Fail with `error` unless every field has content.
pub fn require_all(fields: &[&str], error: impl FnOnce() -> ValidationError) -> Result<(), ValidationError> {
    if fields.iter().any(|f| is_blank(f)) {
        return Err(error());
    }
    Ok(())
}

pub fn has_min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}
