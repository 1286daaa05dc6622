//! Per-call provider parameters.

use std::fmt;

/// Parameters for detached signing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignParams {
    /// Key to sign with (key id, fingerprint or user id).
    pub key_id: Option<String>,
    /// Passphrase unlocking the signing key.
    pub passphrase: Option<String>,
}

impl SignParams {
    /// Creates empty signing parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signing key.
    #[must_use]
    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Sets the key passphrase.
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// True when neither a key nor a passphrase was given.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.key_id.is_none() && self.passphrase.is_none()
    }
}

impl fmt::Debug for SignParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignParams")
            .field("key_id", &self.key_id)
            .field("passphrase", &redacted(self.passphrase.as_ref()))
            .finish()
    }
}

/// How the payload is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// To the public keys of the recipients.
    #[default]
    PublicKey,
    /// With a passphrase only, no recipients.
    Symmetric,
}

/// Parameters for encryption.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EncryptParams {
    /// Public-key or passphrase-only encryption.
    pub mode: EncryptionMode,
    /// Passphrase for symmetric mode.
    pub passphrase: Option<String>,
}

impl EncryptParams {
    /// Public-key encryption to the given recipients.
    #[must_use]
    pub fn public_key() -> Self {
        Self::default()
    }

    /// Passphrase-only encryption.
    #[must_use]
    pub fn symmetric(passphrase: impl Into<String>) -> Self {
        Self {
            mode: EncryptionMode::Symmetric,
            passphrase: Some(passphrase.into()),
        }
    }
}

impl fmt::Debug for EncryptParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptParams")
            .field("mode", &self.mode)
            .field("passphrase", &redacted(self.passphrase.as_ref()))
            .finish()
    }
}

/// Parameters for decryption.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DecryptParams {
    /// Passphrase for the secret key or the symmetric session.
    pub passphrase: Option<String>,
}

impl DecryptParams {
    /// Decryption without a passphrase (agent or unprotected key).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decryption with a passphrase.
    #[must_use]
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Some(passphrase.into()),
        }
    }
}

impl fmt::Debug for DecryptParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptParams")
            .field("passphrase", &redacted(self.passphrase.as_ref()))
            .finish()
    }
}

const fn redacted(secret: Option<&String>) -> Option<&'static str> {
    match secret {
        Some(_) => Some("<redacted>"),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_params_empty() {
        assert!(SignParams::new().is_empty());
        assert!(!SignParams::new().key_id("alice").is_empty());
        assert!(!SignParams::new().passphrase("pw").is_empty());
    }

    #[test]
    fn test_debug_hides_passphrases() {
        let sign = format!("{:?}", SignParams::new().key_id("alice").passphrase("hunter2"));
        assert!(sign.contains("alice"));
        assert!(!sign.contains("hunter2"));

        let encrypt = format!("{:?}", EncryptParams::symmetric("hunter2"));
        assert!(encrypt.contains("Symmetric"));
        assert!(!encrypt.contains("hunter2"));

        let decrypt = format!("{:?}", DecryptParams::with_passphrase("hunter2"));
        assert!(!decrypt.contains("hunter2"));
    }
}
