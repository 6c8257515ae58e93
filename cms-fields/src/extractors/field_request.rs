//! Multipart form extractor for field submissions
//!
//! Collects text parts into a body map and streams file parts to temporary
//! files, so field handlers can move them into place without buffering whole
//! uploads in memory.
//!
//! # Examples
//!
//! ```rust,no_run
//! use axum::{extract::State, response::IntoResponse};
//! use cms_fields::config::UploadsConfig;
//! use cms_fields::document::Document;
//! use cms_fields::error::FieldError;
//! use cms_fields::extractors::FieldRequest;
//! use cms_fields::fields::LocalImageType;
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct AppState {
//!     uploads: UploadsConfig,
//!     image: Arc<LocalImageType>,
//! }
//!
//! impl axum::extract::FromRef<AppState> for UploadsConfig {
//!     fn from_ref(state: &AppState) -> Self {
//!         state.uploads.clone()
//!     }
//! }
//!
//! async fn save_post(
//!     State(state): State<AppState>,
//!     request: FieldRequest,
//! ) -> Result<impl IntoResponse, FieldError> {
//!     let mut post = Document::new();
//!     let outcome = state.image.handle_request(&mut post, &request, None).await;
//!     request.cleanup().await;
//!     outcome?;
//!     Ok(axum::Json(post.to_value()))
//! }
//! ```

use crate::config::UploadsConfig;
use crate::storage::{base_name, ImageProcessor, IncomingFile};
use axum::{
    extract::{multipart::Field, FromRef, FromRequest, Multipart, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const OCTET_STREAM: &str = "application/octet-stream";

/// Error types for form extraction
#[derive(Debug, Error)]
pub enum FieldRequestError {
    /// Failed to read multipart data
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// An uploaded file exceeds the size limit
    #[error("File {name} exceeds maximum of {max} bytes")]
    FileTooLarge {
        /// Form key of the part
        name: String,
        /// Maximum allowed
        max: u64,
    },

    /// An uploaded part could not be written to the temp directory
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for FieldRequestError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => {
                tracing::error!(error = %self, "Failed to park upload");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

/// One form submission: text parts and uploaded files keyed by part name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRequest {
    /// Text parts
    pub body: HashMap<String, String>,
    /// File parts, parked in the temp directory
    pub files: HashMap<String, IncomingFile>,
}

impl FieldRequest {
    /// Text value submitted under `key`
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.body.get(key).map(String::as_str)
    }

    /// File submitted under `key`
    #[must_use]
    pub fn file(&self, key: &str) -> Option<&IncomingFile> {
        self.files.get(key)
    }

    /// Adds a text part
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Adds a file part
    #[must_use]
    pub fn with_file(mut self, key: impl Into<String>, file: IncomingFile) -> Self {
        self.files.insert(key.into(), file);
        self
    }

    /// Reads all parts of a multipart body
    ///
    /// # Errors
    ///
    /// Returns [`FieldRequestError`] if the body is malformed, a file exceeds
    /// `max_file_size` or a temp file cannot be written. Files parked before
    /// the failure are removed.
    pub async fn from_multipart(mut multipart: Multipart, uploads: &UploadsConfig) -> Result<Self, FieldRequestError> {
        let mut request = Self::default();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    request.cleanup().await;
                    return Err(FieldRequestError::Multipart(e.to_string()));
                }
            };

            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                match park_file(field, &name, uploads).await {
                    Ok(file) => {
                        request.files.insert(name, file);
                    }
                    Err(err) => {
                        request.cleanup().await;
                        return Err(err);
                    }
                }
            } else {
                match field.text().await {
                    Ok(value) => {
                        request.body.insert(name, value);
                    }
                    Err(e) => {
                        request.cleanup().await;
                        return Err(FieldRequestError::Multipart(e.to_string()));
                    }
                }
            }
        }

        tracing::debug!(
            text_parts = request.body.len(),
            file_parts = request.files.len(),
            "Extracted field request"
        );
        Ok(request)
    }

    /// Removes temp files that were not moved into place
    pub async fn cleanup(&self) {
        for file in self.files.values() {
            remove_quietly(file.temp_path()).await;
        }
    }
}

impl<S> FromRequest<S> for FieldRequest
where
    S: Send + Sync,
    UploadsConfig: FromRef<S>,
{
    type Rejection = FieldRequestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uploads = UploadsConfig::from_ref(state);
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| FieldRequestError::Multipart(e.to_string()))?;

        Self::from_multipart(multipart, &uploads).await
    }
}

/// Streams one file part into the temp directory
async fn park_file(mut field: Field<'_>, name: &str, uploads: &UploadsConfig) -> Result<IncomingFile, FieldRequestError> {
    let filename = base_name(field.file_name().unwrap_or_default()).to_string();
    let declared = field
        .content_type()
        .filter(|mime| !mime.is_empty() && *mime != OCTET_STREAM)
        .map(str::to_string);

    fs::create_dir_all(&uploads.temp_dir).await?;
    let path = uploads.temp_dir.join(format!("cms-upload-{}", uuid::Uuid::new_v4()));
    let mut out = fs::File::create(&path).await?;

    let mut size: u64 = 0;
    let mut head: Vec<u8> = Vec::new();

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                drop(out);
                remove_quietly(&path).await;
                return Err(FieldRequestError::Multipart(e.to_string()));
            }
        };

        size += chunk.len() as u64;
        if size > uploads.max_file_size {
            drop(out);
            remove_quietly(&path).await;
            return Err(FieldRequestError::FileTooLarge {
                name: name.to_string(),
                max: uploads.max_file_size,
            });
        }

        if head.len() < 64 {
            let take = (64 - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        if let Err(e) = out.write_all(&chunk).await {
            drop(out);
            remove_quietly(&path).await;
            return Err(e.into());
        }
    }
    out.flush().await?;

    let mimetype = declared.unwrap_or_else(|| {
        ImageProcessor::detect_mime(&head)
            .unwrap_or(OCTET_STREAM)
            .to_string()
    });

    tracing::debug!(
        part = %name,
        filename = %filename,
        mimetype = %mimetype,
        size,
        temp = %path.display(),
        "Parked uploaded file"
    );

    Ok(IncomingFile::new(path, filename, mimetype, size))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp upload");
        }
    }
}
