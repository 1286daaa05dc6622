//! MIME header handling.

use crate::error::Result;
use std::borrow::Cow;
use std::fmt;

/// A single header line. Two fields are equal when they write the same
/// bytes.
#[derive(Debug, Clone, Eq)]
struct Field {
    name: String,
    value: String,
    /// Line bytes as received, continuation lines included, without the
    /// final newline. `None` once the field is built or replaced locally.
    raw: Option<Vec<u8>>,
}

impl Field {
    fn new(name: String, value: String) -> Self {
        Self {
            name,
            value,
            raw: None,
        }
    }

    /// Splits a received line at its first colon.
    fn from_raw(raw: Vec<u8>) -> Option<Self> {
        let colon = raw.iter().position(|&b| b == b':')?;
        let name = String::from_utf8_lossy(&raw[..colon]).trim_end().to_string();
        let value = String::from_utf8_lossy(&raw[colon + 1..])
            .trim_start()
            .to_string();
        Some(Self {
            name,
            value,
            raw: Some(raw),
        })
    }

    fn line(&self) -> Cow<'_, [u8]> {
        match &self.raw {
            Some(raw) => Cow::Borrowed(raw),
            None => Cow::Owned(format!("{}: {}", self.name, self.value).into_bytes()),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.line());
        out.push(b'\n');
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.line() == other.line()
    }
}

/// Ordered collection of email headers.
///
/// Parsed headers keep their received bytes (separator spacing, folding
/// and 8-bit octets included) and write back out byte for byte. Headers
/// added or replaced locally are written as `Name: value`. Lookups ignore
/// case and see values decoded as lossy UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<Field>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value after all existing headers.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field::new(name.into(), value.into()));
    }

    /// Sets a header value.
    ///
    /// The first existing header of that name is replaced in place and any
    /// further occurrences are dropped. Appends when the header is absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => {
                let field = &mut self.fields[idx];
                field.value = value;
                field.raw = None;
                let mut seen = 0usize;
                self.fields.retain(|field| {
                    if field.name.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.fields.push(Field::new(name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.fields[idx].value.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
            .collect()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.fields
            .retain(|field| !field.name.eq_ignore_ascii_case(name));
    }

    /// Number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }

    /// Parses a header block.
    ///
    /// Parsing stops at the first empty line. Continuation lines (starting
    /// with space or tab) stay attached to the preceding header. Lines
    /// without a colon are skipped. A trailing CR on each line is dropped.
    ///
    /// # Errors
    ///
    /// Currently infallible for any input; the `Result` leaves room for
    /// stricter modes.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<Vec<u8>> = None;

        for line in raw.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if line.starts_with(b" ") || line.starts_with(b"\t") {
                match current.as_mut() {
                    Some(field) => {
                        field.push(b'\n');
                        field.extend_from_slice(line);
                    }
                    None => tracing::warn!(
                        line = %String::from_utf8_lossy(line),
                        "Skipping continuation line without a header"
                    ),
                }
                continue;
            }

            if let Some(field) = current.take() {
                headers.push_raw(field);
            }

            if line.contains(&b':') {
                current = Some(line.to_vec());
            } else {
                tracing::warn!(
                    line = %String::from_utf8_lossy(line),
                    "Skipping malformed header line"
                );
            }
        }

        if let Some(field) = current {
            headers.push_raw(field);
        }

        Ok(headers)
    }

    /// Appends the header block to `out`, one newline-terminated line per
    /// header.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            field.write_to(out);
        }
    }

    fn push_raw(&mut self, raw: Vec<u8>) {
        if let Some(field) = Field::from_raw(raw) {
            self.fields.push(field);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name.eq_ignore_ascii_case(name))
    }
}

/// Writes the header block, replacing invalid UTF-8.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        self.write_to(&mut out);
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set_keeps_position() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("To", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("to", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["To", "Subject"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_parse_keeps_folding() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            "\tcharset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n",
        );

        let headers = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain;\n\tcharset=utf-8")
        );
    }

    #[test]
    fn test_headers_display_in_order() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com");
        headers.add("From", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\nFrom: sender@example.com\n"
        );
    }

    #[test]
    fn test_headers_parse_display_identity() {
        let text = "Content-Type: multipart/mixed;\n boundary=\"abc\"\nMIME-Version: 1.0\n";
        let headers = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.to_string(), text);
    }

    #[test]
    fn test_headers_skip_malformed_line() {
        let headers = Headers::parse(b"garbage\nSubject: ok\n").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("subject"), Some("ok"));
    }

    #[test]
    fn test_headers_keep_received_spacing() {
        let text = b"Content-Type:text/plain\nSubject:   spaced\n";
        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("subject"), Some("spaced"));

        let mut out = Vec::new();
        headers.write_to(&mut out);
        assert_eq!(out, text);
    }

    #[test]
    fn test_headers_keep_8bit_bytes() {
        let text = b"Content-Disposition: attachment; filename=\"caf\xe9.txt\"\n";
        let headers = Headers::parse(text).unwrap();
        assert!(headers.get("Content-Disposition").unwrap().contains("caf\u{fffd}"));

        let mut out = Vec::new();
        headers.write_to(&mut out);
        assert_eq!(out, text);
    }

    #[test]
    fn test_headers_set_drops_received_bytes() {
        let mut headers = Headers::parse(b"Subject:old\nTo:a@example.com\n").unwrap();
        headers.set("subject", "new");
        assert_eq!(headers.to_string(), "Subject: new\nTo:a@example.com\n");
    }

    #[test]
    fn test_headers_equal_when_bytes_match() {
        let mut built = Headers::new();
        built.add("Content-Type", "text/plain");
        assert_eq!(Headers::parse(b"Content-Type: text/plain\n").unwrap(), built);
        assert_ne!(Headers::parse(b"Content-Type:text/plain\n").unwrap(), built);
    }
}
