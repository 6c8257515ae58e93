//! Error types and error handling
//!
//! Construction-time problems surface as [`FieldError::Configuration`] and are
//! returned synchronously from the field constructor. Everything that can go
//! wrong while handling a single request (validation, hooks, filesystem) is a
//! recoverable per-call error returned from the async operation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by user-supplied hooks and callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for field operations
pub type FieldResult<T> = Result<T, FieldError>;

/// Field error type
#[derive(Debug, Error)]
pub enum FieldError {
    /// Invalid field configuration (fatal, raised at construction)
    #[error("Invalid Configuration: {0}")]
    Configuration(String),

    /// Input rejected before any state was touched
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A `pre:move` or `post:move` hook reported failure
    ///
    /// The hook's error is kept as-is so callers can downcast it.
    #[error(transparent)]
    Hook(BoxError),

    /// Filesystem operation failed
    #[error("Failed to {op} {}: {source}", path.display())]
    Filesystem {
        /// Operation being attempted (`move`, `delete`, ...)
        op: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Image dimensions could not be read from the uploaded file
    #[error("Failed to read image metadata: {0}")]
    ImageMetadata(String),
}

impl FieldError {
    /// Wraps an I/O error with the operation and path it relates to
    pub fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Wraps a hook failure
    pub fn hook(err: impl Into<BoxError>) -> Self {
        Self::Hook(err.into())
    }

    /// HTTP status code appropriate for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::UnsupportedFileType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Validation(ValidationError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Hook(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Configuration(_) | Self::Filesystem { .. } | Self::ImageMetadata(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Recoverable validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// MIME type not present in the configured allow-list
    #[error("Unsupported File Type: {0}")]
    UnsupportedFileType(String),

    /// Malformed input payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl IntoResponse for FieldError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Field operation failed");
        }
        (status, self.to_string()).into_response()
    }
}
