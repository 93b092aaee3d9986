use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};

use crate::error::AppError;
use crate::files::Upload;

/// Largest accepted file part.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
const MAX_TEXT_BYTES: usize = 64 * 1024;

/// A fully read `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl FormData {
    /// Drains the payload. Parts without a filename are text fields; file
    /// inputs left empty by the browser are skipped.
    pub async fn read(mut payload: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(mut field) = payload.try_next().await? {
            let (name, filename) = match field.content_disposition() {
                Some(disposition) => (
                    disposition.get_name().unwrap_or_default().to_string(),
                    disposition.get_filename().map(str::to_string),
                ),
                None => continue,
            };
            let content_type = field.content_type().map(|mime| mime.to_string());
            let limit = if filename.is_some() {
                MAX_FILE_BYTES
            } else {
                MAX_TEXT_BYTES
            };

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if bytes.len() + chunk.len() > limit {
                    return Err(AppError::Validation(format!(
                        "Field '{}' exceeds the {} byte limit",
                        name, limit
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            match filename {
                Some(filename) if !(filename.is_empty() && bytes.is_empty()) => {
                    form.files.insert(
                        name,
                        Upload {
                            filename,
                            content_type,
                            bytes,
                        },
                    );
                }
                Some(_) => {}
                None => {
                    let text = String::from_utf8(bytes).map_err(|_| {
                        AppError::Validation(format!("Field '{}' is not valid UTF-8", name))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
