//! MIME message tree.

use crate::content_type::{ContentType, header_parameters};
use crate::encoding::{
    decode_base64_body, decode_quoted_printable, decode_rfc2047, encode_base64_body,
};
use crate::error::{Error, Result};
use crate::header::Headers;
use rand::Rng;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Picks 7bit for pure ASCII data and 8bit otherwise.
    #[must_use]
    pub fn for_data(data: &[u8]) -> Self {
        if data.is_ascii() {
            Self::SevenBit
        } else {
            Self::EightBit
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Children of a composite node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    /// Text before the first delimiter line, without its trailing newline.
    pub preamble: Option<Vec<u8>>,
    /// Child messages in document order.
    pub parts: Vec<Message>,
    /// Text after the close delimiter line.
    pub epilogue: Option<Vec<u8>>,
}

impl Multipart {
    /// Creates a multipart payload with no preamble or epilogue.
    #[must_use]
    pub const fn new(parts: Vec<Message>) -> Self {
        Self {
            preamble: None,
            parts,
            epilogue: None,
        }
    }
}

/// Payload of a message node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Raw, still transfer-encoded bytes.
    Leaf(Vec<u8>),
    /// Ordered child messages.
    Multipart(Multipart),
}

/// A MIME message: one node of the tree, owning its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Leaf bytes or child parts.
    pub body: Body,
}

impl Message {
    /// Creates a message from headers and a body.
    #[must_use]
    pub const fn new(headers: Headers, body: Body) -> Self {
        Self { headers, body }
    }

    /// Creates a single-part message.
    #[must_use]
    pub const fn leaf(headers: Headers, body: Vec<u8>) -> Self {
        Self::new(headers, Body::Leaf(body))
    }

    /// Creates a text part.
    ///
    /// A `utf-8` body is Base64 encoded; any other charset is sent as is
    /// with a 7bit/8bit transfer encoding chosen from the data.
    #[must_use]
    pub fn text(text: &str, sub_type: &str, charset: &str) -> Self {
        let content_type = ContentType::new("text", sub_type).with_parameter("charset", charset);
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("MIME-Version", "1.0");

        let (encoding, body) = if charset.eq_ignore_ascii_case("utf-8") {
            (TransferEncoding::Base64, encode_base64_body(text.as_bytes()))
        } else {
            let data = text.as_bytes().to_vec();
            (TransferEncoding::for_data(&data), data)
        };
        headers.add("Content-Transfer-Encoding", encoding.to_string());
        Self::leaf(headers, body)
    }

    /// Creates a non-text part carried without re-encoding (7bit or 8bit).
    #[must_use]
    pub fn application(content_type: &ContentType, data: Vec<u8>) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::for_data(&data).to_string(),
        );
        Self::leaf(headers, data)
    }

    /// Creates a binary part carried in Base64.
    #[must_use]
    pub fn binary(content_type: &ContentType, data: &[u8]) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("MIME-Version", "1.0");
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        Self::leaf(headers, encode_base64_body(data))
    }

    /// Creates a composite message.
    ///
    /// When `content_type` carries no boundary a random one is chosen that
    /// does not occur in any child.
    #[must_use]
    pub fn multipart(mut content_type: ContentType, parts: Vec<Self>) -> Self {
        if content_type.boundary().is_none() {
            content_type.set_parameter("boundary", unique_boundary(&parts));
        }
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("MIME-Version", "1.0");
        Self::new(headers, Body::Multipart(Multipart::new(parts)))
    }

    /// Gets the content type, `text/plain` when the header is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the content type, falling back to `text/plain` when invalid.
    #[must_use]
    pub fn content_type_or_default(&self) -> ContentType {
        self.content_type().unwrap_or_else(|_| ContentType::text_plain())
    }

    /// Checks if this node holds child parts.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Child parts, empty for a leaf.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Multipart(multipart) => &multipart.parts,
            Body::Leaf(_) => &[],
        }
    }

    /// Raw leaf bytes, `None` for a composite.
    #[must_use]
    pub fn leaf_body(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Leaf(body) => Some(body),
            Body::Multipart(_) => None,
        }
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the leaf body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error for a composite node or if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let body = self
            .leaf_body()
            .ok_or(Error::BodyKind("cannot decode the body of a multipart node"))?;
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64_body(body),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
            _ => Ok(body.to_vec()),
        }
    }

    /// Declared file name of this part.
    ///
    /// Looks at the `filename` parameter of `Content-Disposition`, then at
    /// the `name` parameter of `Content-Type`. RFC 2047 encoded words are
    /// decoded; the value is otherwise returned untouched, path separators
    /// included.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let from_disposition = self.headers.get("content-disposition").and_then(|value| {
            header_parameters(value)
                .into_iter()
                .find_map(|(key, value)| (key == "filename").then_some(value))
        });

        let raw = from_disposition.or_else(|| {
            self.content_type()
                .ok()
                .and_then(|ct| ct.parameter("name").map(str::to_string))
        })?;

        Some(decode_rfc2047(&raw).unwrap_or(raw))
    }

    /// Boundary parameter of a composite node.
    #[must_use]
    pub fn boundary(&self) -> Option<String> {
        self.content_type()
            .ok()
            .and_then(|ct| ct.boundary().map(str::to_string))
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Depth-first, pre-order walk over this node and all descendants.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Iterator returned by [`Message::walk`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<&'a Message>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.parts().iter().rev());
        Some(node)
    }
}

/// Chooses a boundary absent from the serialized children.
fn unique_boundary(parts: &[Message]) -> String {
    let mut rng = rand::thread_rng();
    let mut rendered = Vec::new();
    for part in parts {
        // A child that cannot be serialized yet cannot collide either.
        if let Ok(bytes) = part.to_bytes() {
            rendered.extend_from_slice(&bytes);
        }
    }

    loop {
        let token: u64 = rng.gen_range(0..i64::MAX.unsigned_abs());
        let candidate = format!("==============={token:019}==");
        if !contains(&rendered, candidate.as_bytes()) {
            return candidate;
        }
        tracing::debug!(candidate, "Boundary collides with part content, retrying");
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_transfer_encoding_for_data() {
        assert_eq!(TransferEncoding::for_data(b"plain"), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_data("ünï".as_bytes()),
            TransferEncoding::EightBit
        );
    }

    #[test]
    fn test_text_utf8_is_base64() {
        let message = Message::text("Grüße\n", "plain", "utf-8");
        assert_eq!(message.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(message.decode_body().unwrap(), "Grüße\n".as_bytes());
        assert_eq!(message.content_type().unwrap().charset(), Some("utf-8"));
    }

    #[test]
    fn test_text_us_ascii_is_raw() {
        let message = Message::text("hello\n", "plain", "us-ascii");
        assert_eq!(message.transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(message.leaf_body(), Some(&b"hello\n"[..]));
    }

    #[test]
    fn test_application_headers_order() {
        let ct = ContentType::new("application", "pgp-encrypted");
        let message = Message::application(&ct, b"Version: 1\n".to_vec());
        let names: Vec<_> = message.headers.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["Content-Type", "MIME-Version", "Content-Transfer-Encoding"]
        );
        assert_eq!(message.transfer_encoding(), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_multipart_gets_boundary() {
        let child = Message::text("x", "plain", "us-ascii");
        let message = Message::multipart(ContentType::multipart("mixed"), vec![child]);
        let boundary = message.boundary().unwrap();
        assert!(boundary.starts_with("==============="));
        assert!(boundary.ends_with("=="));
        assert_eq!(boundary.len(), 15 + 19 + 2);
        assert!(message.is_multipart());
        assert_eq!(message.parts().len(), 1);
    }

    #[test]
    fn test_multipart_keeps_given_boundary() {
        let ct = ContentType::multipart("mixed").with_parameter("boundary", "fixed");
        let message = Message::multipart(ct, vec![Message::text("x", "plain", "us-ascii")]);
        assert_eq!(message.boundary().as_deref(), Some("fixed"));
    }

    #[test]
    fn test_decode_body_rejects_multipart() {
        let message = Message::multipart(ContentType::multipart("mixed"), Vec::new());
        assert!(matches!(message.decode_body(), Err(Error::BodyKind(_))));
    }

    #[test]
    fn test_filename_sources() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "application/pdf; name=\"fallback.pdf\"");
        let message = Message::leaf(headers.clone(), Vec::new());
        assert_eq!(message.filename().as_deref(), Some("fallback.pdf"));

        headers.add("Content-Disposition", "attachment; filename=\"../../etc/passwd\"");
        let message = Message::leaf(headers, Vec::new());
        assert_eq!(message.filename().as_deref(), Some("../../etc/passwd"));
    }

    #[test]
    fn test_filename_rfc2047() {
        let mut headers = Headers::new();
        headers.add("Content-Disposition", "attachment; filename=\"=?utf-8?B?SMOpbGxv?=\"");
        let message = Message::leaf(headers, Vec::new());
        assert_eq!(message.filename().as_deref(), Some("Héllo"));
    }

    #[test]
    fn test_filename_absent() {
        let mut headers = Headers::new();
        headers.add("Content-Disposition", "inline");
        assert_eq!(Message::leaf(headers, Vec::new()).filename(), None);
    }

    #[test]
    fn test_walk_document_order() {
        let a = Message::text("a", "plain", "us-ascii");
        let b = Message::text("b", "plain", "us-ascii");
        let c = Message::text("c", "plain", "us-ascii");
        let inner = Message::multipart(ContentType::multipart("alternative"), vec![b, c]);
        let root = Message::multipart(ContentType::multipart("mixed"), vec![a, inner]);

        let bodies: Vec<_> = root
            .walk()
            .map(|m| m.leaf_body().map(<[u8]>::to_vec))
            .collect();
        assert_eq!(
            bodies,
            vec![
                None,
                Some(b"a".to_vec()),
                None,
                Some(b"b".to_vec()),
                Some(b"c".to_vec()),
            ]
        );
    }
}
