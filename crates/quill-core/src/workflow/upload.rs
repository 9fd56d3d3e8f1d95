//! Upload validation and stored-name generation.

use uuid::Uuid;

use crate::error::ValidationError;

/// Default ceiling for post thumbnails, in bytes.
pub const THUMBNAIL_MAX_BYTES: usize = 2_000_000;

/// Default ceiling for avatars, in bytes.
pub const AVATAR_MAX_BYTES: usize = 500_000;

/// A file received with a request, fully buffered.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file.
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Rules for one attachment slot (post thumbnail, user avatar).
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub slot: &'static str,
    pub max_bytes: usize,
    missing_message: &'static str,
    too_large_subject: &'static str,
}

impl UploadPolicy {
    pub fn thumbnail(max_bytes: usize) -> Self {
        Self {
            slot: "thumbnail",
            max_bytes,
            missing_message: "Image not provided. Please upload an image.",
            too_large_subject: "Image too big.",
        }
    }

    pub fn avatar(max_bytes: usize) -> Self {
        Self {
            slot: "avatar",
            max_bytes,
            missing_message: "Please choose an image",
            too_large_subject: "Profile picture is too big.",
        }
    }

    /// Check presence and size of the slot's upload.
    pub fn check<'u>(&self, upload: Option<&'u Upload>) -> Result<&'u Upload, ValidationError> {
        let upload = upload
            .filter(|u| !u.file_name.is_empty())
            .ok_or_else(|| ValidationError::unprocessable(self.missing_message))?;

        if upload.size() > self.max_bytes {
            return Err(ValidationError::unprocessable(self.too_large_message()));
        }
        Ok(upload)
    }

    pub fn too_large_message(&self) -> String {
        format!(
            "{} It should be less than {}.",
            self.too_large_subject,
            human_size(self.max_bytes)
        )
    }
}

/// Decimal units, matching how the limits are configured.
fn human_size(bytes: usize) -> String {
    if bytes >= 1_000_000 && bytes % 1_000_000 == 0 {
        format!("{} MB", bytes / 1_000_000)
    } else if bytes >= 1_000 && bytes % 1_000 == 0 {
        format!("{} KB", bytes / 1_000)
    } else {
        format!("{bytes} bytes")
    }
}

/// Longest file name most filesystems accept, in bytes.
const NAME_MAX: usize = 255;

/// Extensions beyond this many bytes are cut.
const EXT_MAX: usize = 16;

/// Build a never-reused stored name: `<base><uuid>.<ext>`.
///
/// The base is the first dot-separated segment of the sanitized original
/// name and the extension its last one. Names without an extension keep no
/// trailing dot. The base is shortened so the whole name fits in `NAME_MAX`
/// bytes.
pub fn unique_file_name(original: &str) -> String {
    let cleaned = sanitize_filename::sanitize(original);
    let token = Uuid::new_v4().to_string();

    let mut segments = cleaned.split('.');
    let base = segments.next().unwrap_or_default();
    let ext = segments
        .last()
        .map(|ext| truncate_bytes(ext, EXT_MAX))
        .filter(|ext| !ext.is_empty());

    let suffix_len = token.len() + ext.map_or(0, |ext| ext.len() + 1);
    let base = truncate_bytes(base, NAME_MAX - suffix_len);
    match ext {
        Some(ext) => format!("{base}{token}.{ext}"),
        None => format!("{base}{token}"),
    }
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
