//! MIME message parser.
//!
//! Parsing is the exact inverse of [`Message::to_bytes`]: bytes written by
//! the generator parse back into a tree that serializes to the same bytes.
//! Input with CRLF line endings is normalized to LF first.

use crate::error::Result;
use crate::header::Headers;
use crate::message::{Body, Message, Multipart};

/// Nesting depth past which multipart bodies are kept as opaque leaves.
const MAX_DEPTH: usize = 64;

impl Message {
    /// Parses a raw message.
    ///
    /// # Errors
    ///
    /// Returns an error if the header block cannot be parsed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let normalized = normalize_newlines(raw);
        parse_node(&normalized, 0)
    }
}

/// Converts every CRLF pair to a single LF.
#[must_use]
pub fn normalize_newlines(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}

fn parse_node(data: &[u8], depth: usize) -> Result<Message> {
    let (header_block, body) = split_header_block(data);
    let headers = Headers::parse(header_block)?;
    let mut message = Message::leaf(headers, Vec::new());

    let boundary = message
        .content_type()
        .ok()
        .filter(|ct| ct.is_multipart())
        .and_then(|ct| ct.boundary().map(str::to_string));

    message.body = match boundary {
        Some(_) if depth >= MAX_DEPTH => {
            tracing::warn!(depth, "Multipart nesting too deep, keeping body opaque");
            Body::Leaf(body.to_vec())
        }
        Some(boundary) => match split_multipart(body, &boundary, depth)? {
            Some(multipart) => Body::Multipart(multipart),
            None => {
                tracing::warn!(boundary, "Boundary not found in multipart body");
                Body::Leaf(body.to_vec())
            }
        },
        None => Body::Leaf(body.to_vec()),
    };

    Ok(message)
}

/// Splits at the first empty line. The header block keeps its final newline.
fn split_header_block(data: &[u8]) -> (&[u8], &[u8]) {
    if data.first() == Some(&b'\n') {
        return (&[], &data[1..]);
    }
    match data.windows(2).position(|w| w == b"\n\n") {
        Some(idx) => (&data[..=idx], &data[idx + 2..]),
        None => (data, &[]),
    }
}

/// A delimiter line found in a multipart body.
#[derive(Debug, Clone, Copy)]
struct Delimiter {
    /// Offset of the first `-` of the line.
    start: usize,
    /// Offset just past the line's newline.
    next: usize,
    /// Whether this is the close delimiter (`--boundary--`).
    close: bool,
}

fn find_delimiter(body: &[u8], from: usize, delimiter: &[u8]) -> Option<Delimiter> {
    let mut pos = from;
    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |offset| pos + offset);
        let line = &body[pos..line_end];

        if let Some(rest) = line.strip_prefix(delimiter) {
            let (close, padding) = rest
                .strip_prefix(b"--")
                .map_or((false, rest), |after| (true, after));
            if padding.iter().all(u8::is_ascii_whitespace) {
                return Some(Delimiter {
                    start: pos,
                    next: (line_end + 1).min(body.len()),
                    close,
                });
            }
        }

        pos = line_end + 1;
    }
    None
}

fn split_multipart(body: &[u8], boundary: &str, depth: usize) -> Result<Option<Multipart>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let Some(first) = find_delimiter(body, 0, delimiter) else {
        return Ok(None);
    };

    let mut multipart = Multipart {
        // The newline ending the preamble belongs to the delimiter.
        preamble: (first.start > 0).then(|| body[..first.start - 1].to_vec()),
        ..Multipart::default()
    };

    let mut current = first;
    while !current.close {
        let content_start = current.next;
        match find_delimiter(body, content_start, delimiter) {
            Some(next) => {
                let content_end = next.start.saturating_sub(1).max(content_start);
                multipart
                    .parts
                    .push(parse_node(&body[content_start..content_end], depth + 1)?);
                current = next;
            }
            None => {
                tracing::warn!(boundary, "Missing close delimiter");
                multipart
                    .parts
                    .push(parse_node(&body[content_start..], depth + 1)?);
                return Ok(Some(multipart));
            }
        }
    }

    let rest = &body[current.next..];
    if !rest.is_empty() {
        multipart.epilogue = Some(rest.to_vec());
    }

    Ok(Some(multipart))
}
