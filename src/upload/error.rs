//! # Errores de Upload
//! src/upload/error.rs

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Falta el boundary, el header `Content-Disposition` o el filename
    #[error("malformed multipart body: {0}")]
    MalformedBody(String),

    /// Se agotó el `Content-Length` antes del boundary final
    #[error("unexpected end of data before the closing boundary")]
    TruncatedBody,

    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        UploadError::MalformedBody(reason.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        UploadError::IoFailure {
            context: context.into(),
            source,
        }
    }
}
