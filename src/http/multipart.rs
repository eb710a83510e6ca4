//! `multipart/form-data` decoding.
//!
//! Parts carrying a file name become [`UploadedFile`]s; the file name is also
//! recorded as a parameter value under the field name. Other parts are plain
//! form parameters.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};

use crate::http::request::ParamMultiMap;

/// A file received in a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was posted under.
    pub field_name: String,
    /// File name as submitted by the client.
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(field_name: impl Into<String>, file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: None,
            content: content.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Extension of the submitted file name, without the dot.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }
}

/// Decoded multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub params: ParamMultiMap,
    pub files: HashMap<String, Vec<UploadedFile>>,
}

/// Drain a multipart stream into parameters and files.
pub async fn decode(mut multipart: Multipart) -> Result<MultipartForm, MultipartError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field.content_type().map(str::to_string);
                let content = field.bytes().await?;
                tracing::debug!(field = %name, file = %file_name, size = content.len(), "Received upload");

                form.params.append(name.clone(), file_name.clone());
                form.files.entry(name.clone()).or_default().push(UploadedFile {
                    field_name: name,
                    file_name,
                    content_type,
                    content,
                });
            }
            _ => {
                let value = field.text().await?;
                form.params.append(name, value);
            }
        }
    }

    Ok(form)
}
