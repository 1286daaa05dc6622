//! Role classification and validation of received composites.

use super::{ENCRYPTION_PROTOCOL, SIGNATURE_PROTOCOL};
use crate::error::{Error, Result};
use mimeseal_mime::{ContentType, Message};
use std::fmt;

/// Semantic role of a child of a PGP/MIME composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartRole {
    /// `application/pgp-encrypted` version marker.
    Control,
    /// `application/pgp-signature` detached signature.
    Signature,
    /// `application/octet-stream` encrypted payload.
    Ciphertext,
    /// Signed content of a `multipart/signed`.
    Body,
    /// Anything not allowed in an encrypted composite.
    Unknown,
}

impl fmt::Display for PartRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "control",
            Self::Signature => "signature",
            Self::Ciphertext => "ciphertext",
            Self::Body => "body",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Allowlisted leaf types and the role each one plays.
const ROLES: &[(&str, &str, PartRole)] = &[
    ("application", "pgp-encrypted", PartRole::Control),
    ("application", "pgp-signature", PartRole::Signature),
    ("application", "octet-stream", PartRole::Ciphertext),
];

impl PartRole {
    /// Looks up the role of a leaf content type. Composite children and
    /// unlisted types are [`PartRole::Unknown`].
    #[must_use]
    pub fn classify(part: &Message) -> Self {
        if part.is_multipart() {
            return Self::Unknown;
        }
        let content_type = part.content_type_or_default();
        ROLES
            .iter()
            .find(|(main, sub, _)| content_type.is(main, sub))
            .map_or(Self::Unknown, |(_, _, role)| *role)
    }

    /// Role inside a `multipart/signed`: everything but a signature is body.
    fn classify_signed(part: &Message) -> Self {
        match Self::classify(part) {
            Self::Signature => Self::Signature,
            _ => Self::Body,
        }
    }
}

fn require_composite<'a>(
    message: &'a Message,
    sub_type: &str,
    protocol: &str,
) -> Result<&'a [Message]> {
    let content_type = message
        .content_type()
        .map_err(|err| Error::structure(format!("unreadable content type: {err}")))?;

    if !content_type.is("multipart", sub_type) {
        return Err(Error::structure(format!(
            "expected multipart/{sub_type}, found {}",
            content_type.essence()
        )));
    }
    if !protocol_matches(&content_type, protocol) {
        return Err(Error::structure(format!(
            "multipart/{sub_type} requires protocol=\"{protocol}\", found {:?}",
            content_type.parameter("protocol").unwrap_or_default()
        )));
    }
    if !message.is_multipart() {
        return Err(Error::structure(format!("multipart/{sub_type} has no child parts")));
    }
    Ok(message.parts())
}

fn protocol_matches(content_type: &ContentType, protocol: &str) -> bool {
    content_type
        .parameter("protocol")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(protocol))
}

/// Picks exactly one child for each of the two roles, rejecting anything else.
fn assign_roles<'a>(
    parts: &'a [Message],
    classify: fn(&Message) -> PartRole,
    roles: (PartRole, PartRole),
    kind: &str,
) -> Result<(&'a Message, &'a Message)> {
    let mut first = None;
    let mut second = None;

    for (idx, part) in parts.iter().enumerate() {
        let role = classify(part);
        let slot = if role == roles.0 {
            &mut first
        } else if role == roles.1 {
            &mut second
        } else {
            return Err(Error::structure(format!(
                "{kind}: unexpected part {} of type {}",
                idx + 1,
                describe(part)
            )));
        };
        if slot.replace(part).is_some() {
            return Err(Error::structure(format!("{kind}: more than one {role} part")));
        }
    }

    let missing = |role: PartRole| Error::structure(format!("{kind}: missing {role} part"));
    Ok((
        first.ok_or_else(|| missing(roles.0))?,
        second.ok_or_else(|| missing(roles.1))?,
    ))
}

fn describe(part: &Message) -> String {
    if part.is_multipart() {
        format!("{} (composite)", part.content_type_or_default().essence())
    } else {
        part.content_type_or_default().essence()
    }
}

/// Splits a `multipart/encrypted` message into its control and ciphertext
/// parts.
///
/// Children are matched by content type, not by position. Exactly one
/// control and one ciphertext part must be present and nothing else.
///
/// # Errors
///
/// Returns [`Error::Structure`] if the message is not a well-formed
/// encrypted composite.
pub fn extract_encrypted_parts(message: &Message) -> Result<(&Message, &Message)> {
    let parts = require_composite(message, "encrypted", ENCRYPTION_PROTOCOL)?;
    let (control, ciphertext) = assign_roles(
        parts,
        PartRole::classify,
        (PartRole::Control, PartRole::Ciphertext),
        "multipart/encrypted",
    )?;
    tracing::debug!(parts = parts.len(), "Extracted encrypted parts");
    Ok((control, ciphertext))
}

/// Splits a `multipart/signed` message into its body and signature parts.
///
/// # Errors
///
/// Returns [`Error::Structure`] unless there is exactly one signature part
/// and exactly one other part.
pub fn extract_signed_parts(message: &Message) -> Result<(&Message, &Message)> {
    let parts = require_composite(message, "signed", SIGNATURE_PROTOCOL)?;
    let (body, signature) = assign_roles(
        parts,
        PartRole::classify_signed,
        (PartRole::Body, PartRole::Signature),
        "multipart/signed",
    )?;
    tracing::debug!(parts = parts.len(), "Extracted signed parts");
    Ok((body, signature))
}
