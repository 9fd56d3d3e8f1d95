//! Buffered `multipart/form-data` bodies.

use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use futures::TryStreamExt as _;

use quill_core::workflow::Upload;

use crate::middleware::error::{AppError, AppResult};

/// Text fields and file parts of one form submission.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl Form {
    /// Read the whole body, failing once more than `limit` bytes arrive.
    pub async fn read(mut payload: Multipart, limit: usize) -> AppResult<Self> {
        let mut form = Self::default();
        let mut received = 0usize;

        while let Some(mut field) = payload
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let data = read_field(&mut field, &mut received, limit).await?;

            match file_name {
                // Browsers send an unnamed empty part for an untouched file input.
                Some(file_name) if file_name.is_empty() && data.is_empty() => {}
                Some(file_name) => {
                    form.files.insert(name, Upload::new(file_name, data));
                }
                None => {
                    let text = String::from_utf8(data).map_err(|_| {
                        AppError::BadRequest(format!("Field {name} is not valid UTF-8"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Value of a text field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}

async fn read_field(field: &mut Field, received: &mut usize, limit: usize) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Upload read error: {e}")))?
    {
        *received += chunk.len();
        if *received > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "Request body exceeds {limit} bytes"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}
