//! # mimeseal-mime
//!
//! MIME message tree, parser and byte-exact serializer.
//!
//! ## Features
//!
//! - **Tree model**: every node owns its headers and either raw body bytes
//!   or an ordered list of children
//! - **Exact round trips**: parsing serializer output and serializing it
//!   again reproduces the input byte for byte, folded headers, preambles
//!   and epilogues included
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//! - **Content types**: ordered parameters, quote-aware parsing
//!
//! ## Quick Start
//!
//! ```ignore
//! use mimeseal_mime::{ContentType, Message};
//!
//! let body = Message::text("Hello, World!\n", "plain", "us-ascii");
//! let note = Message::binary(&ContentType::new("application", "pdf"), &pdf_bytes);
//! let message = Message::multipart(ContentType::multipart("mixed"), vec![body, note]);
//!
//! let wire = message.to_bytes()?;
//! let parsed = Message::parse(&wire)?;
//! assert_eq!(parsed.to_bytes()?, wire);
//!
//! for part in parsed.walk().filter(|p| !p.is_multipart()) {
//!     println!("{:?}: {} bytes", part.filename(), part.decode_body()?.len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod generator;
mod header;
mod message;
mod parser;

pub mod encoding;
pub mod mime_types;

pub use content_type::{ContentType, header_parameters, split_outside_quotes};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Body, Message, Multipart, TransferEncoding, Walk};
pub use parser::normalize_newlines;
