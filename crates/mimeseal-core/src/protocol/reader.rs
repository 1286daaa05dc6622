//! Inbound pipelines: decrypt, verify, and the read dispatcher.

use super::canonical::canonicalize;
use super::parts::{extract_encrypted_parts, extract_signed_parts};
use crate::error::{Error, Result};
use crate::provider::{CryptoProvider, DecryptParams, Verification};
use mimeseal_mime::Message;

/// A message recovered from a PGP/MIME structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    /// The plain content.
    pub message: Message,
    /// Outcome of the signature check; `None` when nothing was signed.
    pub verification: Option<Verification>,
}

impl Recovered {
    /// True when a valid signature covered the content.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification.as_ref().is_some_and(|v| v.valid)
    }
}

/// Shape of a received top-level message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Received {
    Encrypted,
    Signed,
    Plain,
}

impl Received {
    fn of(message: &Message) -> Self {
        let content_type = message.content_type_or_default();
        if content_type.is("multipart", "encrypted") {
            Self::Encrypted
        } else if content_type.is("multipart", "signed") {
            Self::Signed
        } else {
            Self::Plain
        }
    }
}

/// Decrypts a `multipart/encrypted` message and parses the plaintext.
///
/// # Errors
///
/// - [`Error::Structure`] if the composite is malformed
/// - [`Error::Mime`] if the ciphertext body cannot be decoded
/// - [`Error::Crypto`] if the provider fails
pub fn decrypt<P>(message: &Message, provider: &P, params: &DecryptParams) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    let (_control, ciphertext) = extract_encrypted_parts(message)?;
    let data = ciphertext.decode_body()?;
    let plain = provider.decrypt(&data, params)?;
    tracing::debug!(
        ciphertext_bytes = data.len(),
        plaintext_bytes = plain.len(),
        "Decrypted message"
    );
    Ok(Message::parse(&plain)?)
}

/// Verifies a `multipart/signed` message, decrypting it first when it is
/// `multipart/encrypted`.
///
/// The body is canonicalized exactly as it was for signing. On success a
/// copy of the body is returned with the verification outcome.
///
/// # Errors
///
/// - [`Error::Verification`] if the signature does not verify
/// - [`Error::Structure`] if a composite is malformed
/// - [`Error::Crypto`] if the provider fails
pub fn verify<P>(
    message: &Message,
    provider: &P,
    params: &DecryptParams,
) -> Result<(Message, Verification)>
where
    P: CryptoProvider + ?Sized,
{
    if Received::of(message) == Received::Encrypted {
        let decrypted = decrypt(message, provider, params)?;
        return verify(&decrypted, provider, params);
    }

    let (body, signature) = extract_signed_parts(message)?;
    let canonical = canonicalize(body)?;
    let signature = signature.decode_body()?;
    let verification = provider.verify(&signature, &canonical)?;

    if !verification.valid {
        tracing::warn!(signer = verification.signer_label(), "Signature did not verify");
        return Err(Error::Verification {
            signer: verification.signer.or(verification.key_id),
            reason: verification
                .status
                .unwrap_or_else(|| "invalid signature".to_string()),
        });
    }

    tracing::debug!(signer = verification.signer_label(), "Signature verified");
    Ok((body.clone(), verification))
}

/// Recovers the plain content of a received message.
///
/// Encrypted input is decrypted and, when the plaintext is signed,
/// verified. Signed input is verified. Anything else is rejected.
///
/// # Errors
///
/// - [`Error::Unsupported`] if the message is neither encrypted nor signed
/// - any error of [`decrypt`] or [`verify`]
pub fn read<P>(message: &Message, provider: &P, params: &DecryptParams) -> Result<Recovered>
where
    P: CryptoProvider + ?Sized,
{
    match Received::of(message) {
        Received::Encrypted => {
            let decrypted = decrypt(message, provider, params)?;
            if Received::of(&decrypted) == Received::Signed {
                let (message, verification) = verify(&decrypted, provider, params)?;
                Ok(Recovered {
                    message,
                    verification: Some(verification),
                })
            } else {
                Ok(Recovered {
                    message: decrypted,
                    verification: None,
                })
            }
        }
        Received::Signed => {
            let (message, verification) = verify(message, provider, params)?;
            Ok(Recovered {
                message,
                verification: Some(verification),
            })
        }
        Received::Plain => Err(Error::Unsupported(
            message.content_type_or_default().essence(),
        )),
    }
}
