//! Error types for MIME operations.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Multipart node without a boundary parameter.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// Multipart node that cannot be written out.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// Operation needs a leaf body but found children, or the reverse.
    #[error("Unexpected body kind: {0}")]
    BodyKind(&'static str),
}
