//! The crypto backend seam.
//!
//! The protocol code never signs or encrypts anything itself: it hands
//! canonicalized bytes to a [`CryptoProvider`] and wraps what comes back.
//! Key material and passphrases travel in the per-call parameter structs,
//! so a provider holds no secret state between calls.

mod gpg;
mod params;
mod process;

pub use gpg::{GpgConfig, GpgConfigBuilder, GpgProvider};
pub use params::{DecryptParams, EncryptParams, EncryptionMode, SignParams};

use std::fmt;

/// Provider operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoOperation {
    /// Detached signing.
    Sign,
    /// Encryption to recipients or with a passphrase.
    Encrypt,
    /// Decryption.
    Decrypt,
    /// Signature verification.
    Verify,
}

impl fmt::Display for CryptoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sign => write!(f, "sign"),
            Self::Encrypt => write!(f, "encrypt"),
            Self::Decrypt => write!(f, "decrypt"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// A provider-reported failure.
#[derive(Debug, thiserror::Error)]
#[error("Crypto error: {operation} failed: {reason}")]
pub struct CryptoError {
    /// The operation that failed.
    pub operation: CryptoOperation,
    /// Provider diagnostic.
    pub reason: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CryptoError {
    /// Creates an error with a diagnostic message.
    #[must_use]
    pub fn new(operation: CryptoOperation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        operation: CryptoOperation,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            operation,
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    /// Whether the signature is good.
    pub valid: bool,
    /// Signer identity (usually `Name <address>`).
    pub signer: Option<String>,
    /// Long key id of the signing key.
    pub key_id: Option<String>,
    /// Fingerprint of the signing key.
    pub fingerprint: Option<String>,
    /// Raw provider status text, for diagnostics.
    pub status: Option<String>,
}

impl Verification {
    /// A good signature by `signer`.
    #[must_use]
    pub fn good(signer: impl Into<String>) -> Self {
        Self {
            valid: true,
            signer: Some(signer.into()),
            ..Self::default()
        }
    }

    /// A bad or unverifiable signature.
    #[must_use]
    pub fn bad(status: impl Into<String>) -> Self {
        Self {
            valid: false,
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Signer for display, falling back to the key id.
    #[must_use]
    pub fn signer_label(&self) -> &str {
        self.signer
            .as_deref()
            .or(self.key_id.as_deref())
            .unwrap_or("unknown signer")
    }
}

/// Sign/encrypt/decrypt/verify primitives used by the protocol layer.
///
/// Every call is synchronous and independent. Failures are returned as
/// [`CryptoError`]; an invalid signature is not a failure of `verify` but a
/// [`Verification`] with `valid == false`.
pub trait CryptoProvider {
    /// Produces a detached signature over `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot sign.
    fn sign(&self, data: &[u8], params: &SignParams) -> Result<Vec<u8>, CryptoError>;

    /// Encrypts `data` for `recipients` (empty in symmetric mode).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot encrypt.
    fn encrypt(
        &self,
        data: &[u8],
        recipients: &[String],
        params: &EncryptParams,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypts `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot decrypt.
    fn decrypt(&self, data: &[u8], params: &DecryptParams) -> Result<Vec<u8>, CryptoError>;

    /// Checks a detached `signature` over `signed_data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the check could not be carried out at all.
    fn verify(&self, signature: &[u8], signed_data: &[u8]) -> Result<Verification, CryptoError>;
}
