//! Error types for the PGP/MIME core.

use crate::provider::CryptoError;
use thiserror::Error;

/// Errors that can occur while building, reading or unpacking messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The tree could not be serialized (e.g. a multipart with no parts).
    #[error("Serialization error: {0}")]
    Serialization(#[source] mimeseal_mime::Error),

    /// A received composite does not have the required shape.
    #[error("Structure error: {0}")]
    Structure(String),

    /// The message is neither encrypted nor signed.
    #[error("Unsupported content type: {0}")]
    Unsupported(String),

    /// The crypto provider failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A signature is present but does not verify.
    #[error("Verification failed{}: {reason}", signer.as_deref().map(|s| format!(" for {s}")).unwrap_or_default())]
    Verification {
        /// Signer identity reported by the provider, if any.
        signer: Option<String>,
        /// Provider diagnostic.
        reason: String,
    },

    /// Required parameters are missing or contradictory.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Received content could not be decoded.
    #[error("MIME error: {0}")]
    Mime(#[from] mimeseal_mime::Error),

    /// I/O error while materializing parts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
