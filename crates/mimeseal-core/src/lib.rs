//! # mimeseal-core
//!
//! PGP/MIME (RFC 3156) message construction and deconstruction.
//!
//! This crate provides:
//! - **Canonicalizer** - exact byte forms for signing and encryption
//! - **Part Extractor** - role-based validation of received composites
//! - **Protocol Builder** - `multipart/signed` and `multipart/encrypted` output
//! - **Protocol Reader** - decrypt, verify and the read dispatcher
//! - **Unpacker** - writes recovered parts to a directory or a stream
//! - **GnuPG provider** - a [`CryptoProvider`] driving the `gpg` binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod protocol;
pub mod provider;
pub mod unpack;

pub use error::{Error, Result};
pub use protocol::{
    PartRole, Recovered, canonicalize, decrypt, encrypt, encrypt_symmetric,
    extract_encrypted_parts, extract_signed_parts, read, serialize_for_encryption, sign,
    sign_and_encrypt, sign_and_encrypt_symmetric, verify,
};
pub use provider::{
    CryptoError, CryptoOperation, CryptoProvider, DecryptParams, EncryptParams, EncryptionMode,
    GpgConfig, GpgConfigBuilder, GpgProvider, SignParams, Verification,
};
pub use unpack::{Destination, Directory, Stream, Unpack, UnpackedPart, unpack, unpack_all};
