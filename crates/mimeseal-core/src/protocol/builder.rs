//! Outbound PGP/MIME structures.

use super::canonical::{canonicalize, serialize_for_encryption};
use super::{CONTROL_BODY, ENCRYPTION_PROTOCOL, MICALG, SIGNATURE_PROTOCOL};
use crate::error::{Error, Result};
use crate::provider::{CryptoProvider, EncryptParams, EncryptionMode, SignParams};
use mimeseal_mime::{ContentType, Message};

/// Wraps `message` in a `multipart/signed` composite.
///
/// The provider signs the CRLF canonical form of `message`; the result has
/// children `[message, signature]`.
///
/// # Errors
///
/// - [`Error::Configuration`] if `params` names neither a key nor a passphrase
/// - [`Error::Serialization`] if `message` cannot be serialized
/// - [`Error::Crypto`] if the provider fails
pub fn sign<P>(message: &Message, provider: &P, params: &SignParams) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    if params.is_empty() {
        return Err(Error::configuration(
            "signing requires a key id or a passphrase",
        ));
    }

    let canonical = canonicalize(message)?;
    let signature = provider.sign(&canonical, params)?;
    tracing::debug!(
        signed_bytes = canonical.len(),
        signature_bytes = signature.len(),
        "Created detached signature"
    );

    let content_type = ContentType::multipart("signed")
        .with_parameter("micalg", MICALG)
        .with_parameter("protocol", SIGNATURE_PROTOCOL);
    let mut signed = Message::multipart(content_type, vec![message.clone(), signature_part(signature)]);
    signed.headers.add("Content-Disposition", "inline");
    Ok(signed)
}

/// Wraps `message` in a `multipart/encrypted` composite.
///
/// The serialized bytes are encrypted as they are, without CRLF conversion.
/// Public-key mode needs at least one recipient; symmetric mode needs a
/// passphrase and no recipients.
///
/// # Errors
///
/// - [`Error::Configuration`] if recipients and mode do not agree
/// - [`Error::Serialization`] if `message` cannot be serialized
/// - [`Error::Crypto`] if the provider fails
pub fn encrypt<P>(
    message: &Message,
    recipients: &[String],
    provider: &P,
    params: &EncryptParams,
) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    check_encrypt_params(recipients, params)?;

    let plain = serialize_for_encryption(message)?;
    let ciphertext = provider.encrypt(&plain, recipients, params)?;
    tracing::debug!(
        recipients = recipients.len(),
        mode = ?params.mode,
        ciphertext_bytes = ciphertext.len(),
        "Encrypted message"
    );

    let content_type =
        ContentType::multipart("encrypted").with_parameter("protocol", ENCRYPTION_PROTOCOL);
    let mut encrypted = Message::multipart(
        content_type,
        vec![control_part(), ciphertext_part(ciphertext)],
    );
    encrypted.headers.add("Content-Disposition", "inline");
    Ok(encrypted)
}

/// Signs `message`, then encrypts the signed composite.
///
/// Readers must decrypt before they can verify.
///
/// # Errors
///
/// Any error of [`sign`] or [`encrypt`].
pub fn sign_and_encrypt<P>(
    message: &Message,
    recipients: &[String],
    provider: &P,
    sign_params: &SignParams,
    encrypt_params: &EncryptParams,
) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    let signed = sign(message, provider, sign_params)?;
    encrypt(&signed, recipients, provider, encrypt_params)
}

/// Signs `message`, then encrypts the signed composite with a passphrase
/// only.
///
/// # Errors
///
/// Any error of [`sign`] or [`encrypt`].
pub fn sign_and_encrypt_symmetric<P>(
    message: &Message,
    provider: &P,
    sign_params: &SignParams,
    passphrase: &str,
) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    sign_and_encrypt(
        message,
        &[],
        provider,
        sign_params,
        &EncryptParams::symmetric(passphrase),
    )
}

/// Encrypts `message` with a passphrase only, without signing it.
///
/// # Errors
///
/// Any error of [`encrypt`].
pub fn encrypt_symmetric<P>(message: &Message, provider: &P, passphrase: &str) -> Result<Message>
where
    P: CryptoProvider + ?Sized,
{
    encrypt(message, &[], provider, &EncryptParams::symmetric(passphrase))
}

fn check_encrypt_params(recipients: &[String], params: &EncryptParams) -> Result<()> {
    if recipients.iter().any(|r| r.trim().is_empty()) {
        return Err(Error::configuration("recipient identities must not be blank"));
    }
    match params.mode {
        EncryptionMode::PublicKey if recipients.is_empty() => Err(Error::configuration(
            "public-key encryption requires at least one recipient",
        )),
        EncryptionMode::Symmetric if !recipients.is_empty() => Err(Error::configuration(
            "symmetric encryption takes no recipients",
        )),
        EncryptionMode::Symmetric if params.passphrase.as_deref().is_none_or(str::is_empty) => {
            Err(Error::configuration("symmetric encryption requires a passphrase"))
        }
        _ => Ok(()),
    }
}

/// Armored provider output goes out as is; anything else as Base64.
fn provider_output_part(content_type: &ContentType, data: Vec<u8>, description: &str) -> Message {
    let mut part = if is_text(&data) {
        Message::application(content_type, data)
    } else {
        Message::binary(content_type, &data)
    };
    part.headers.add("Content-Description", description);
    part
}

fn is_text(data: &[u8]) -> bool {
    data.iter()
        .all(|&b| b == b'\n' || b == b'\t' || (b' '..=b'~').contains(&b))
}

fn signature_part(signature: Vec<u8>) -> Message {
    let content_type = ContentType::new("application", "pgp-signature")
        .with_parameter("name", "signature.asc")
        .with_parameter("charset", "us-ascii");
    provider_output_part(&content_type, signature, "OpenPGP digital signature")
}

fn ciphertext_part(ciphertext: Vec<u8>) -> Message {
    let content_type = ContentType::new("application", "octet-stream")
        .with_parameter("name", "encrypted.asc")
        .with_parameter("charset", "us-ascii");
    provider_output_part(&content_type, ciphertext, "OpenPGP encrypted message")
}

fn control_part() -> Message {
    let content_type =
        ContentType::new("application", "pgp-encrypted").with_parameter("charset", "us-ascii");
    Message::application(&content_type, CONTROL_BODY.to_vec())
}
