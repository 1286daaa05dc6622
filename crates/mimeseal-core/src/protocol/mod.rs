//! RFC 3156 PGP/MIME framing.
//!
//! This module provides:
//! - **Canonicalizer**: the exact bytes handed to the provider
//! - **Part extraction**: role-based validation of received composites
//! - **Builder**: signed and encrypted outbound structures
//! - **Reader**: decrypt and verify pipelines for received structures
//!
//! # Example
//!
//! ```ignore
//! use mimeseal_core::protocol::{read, sign};
//! use mimeseal_core::{DecryptParams, GpgProvider, SignParams};
//!
//! let provider = GpgProvider::default();
//! let signed = sign(&message, &provider, &SignParams::new().key_id("alice@example.com"))?;
//!
//! let recovered = read(&signed, &provider, &DecryptParams::new())?;
//! assert!(recovered.verification.is_some_and(|v| v.valid));
//! ```

mod builder;
mod canonical;
mod parts;
mod reader;

pub use builder::{encrypt, encrypt_symmetric, sign, sign_and_encrypt, sign_and_encrypt_symmetric};
pub use canonical::{canonicalize, serialize_for_encryption, to_crlf};
pub use parts::{PartRole, extract_encrypted_parts, extract_signed_parts};
pub use reader::{Recovered, decrypt, read, verify};

/// `protocol` parameter of a signed composite.
pub const SIGNATURE_PROTOCOL: &str = "application/pgp-signature";

/// `protocol` parameter of an encrypted composite.
pub const ENCRYPTION_PROTOCOL: &str = "application/pgp-encrypted";

/// `micalg` parameter of a signed composite.
pub const MICALG: &str = "pgp-sha1";

/// Body of the control part.
pub const CONTROL_BODY: &[u8] = b"Version: 1\n";
