//! Byte forms handed to the crypto provider.
//!
//! Signing and verification operate on CRLF text; encryption takes the
//! serialized bytes unchanged. The two paths stay separate.

use crate::error::{Error, Result};
use mimeseal_mime::Message;

/// Serializes `message` and converts every line ending to CRLF.
///
/// Used for the input of signing and of verification only.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the tree is malformed.
pub fn canonicalize(message: &Message) -> Result<Vec<u8>> {
    let serialized = message.to_bytes().map_err(Error::Serialization)?;
    Ok(to_crlf(&serialized))
}

/// Serializes `message` for encryption, with no line-ending conversion.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if the tree is malformed.
pub fn serialize_for_encryption(message: &Message) -> Result<Vec<u8>> {
    message.to_bytes().map_err(Error::Serialization)
}

/// Rewrites every LF as CRLF.
///
/// An LF already preceded by CR is kept as is and a lone CR is left
/// untouched, so the result never contains CR CR LF unless the input did.
#[must_use]
pub fn to_crlf(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|&&b| b == b'\n').count();
    let mut out = Vec::with_capacity(data.len() + extra);
    let mut previous = None;
    for &byte in data {
        if byte == b'\n' && previous != Some(b'\r') {
            out.push(b'\r');
        }
        out.push(byte);
        previous = Some(byte);
    }
    out
}
