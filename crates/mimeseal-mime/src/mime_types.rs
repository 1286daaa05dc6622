//! Mapping between content types and file extensions.

use std::path::Path;

/// Known `(content type, extension)` pairs. The first entry for a content
/// type is its preferred extension.
const TYPES: &[(&str, &str)] = &[
    ("application/gzip", ".gz"),
    ("application/json", ".json"),
    ("application/msword", ".doc"),
    ("application/octet-stream", ".bin"),
    ("application/pdf", ".pdf"),
    ("application/pgp-keys", ".asc"),
    ("application/postscript", ".ps"),
    ("application/rtf", ".rtf"),
    ("application/vnd.ms-excel", ".xls"),
    ("application/x-tar", ".tar"),
    ("application/xml", ".xml"),
    ("application/zip", ".zip"),
    ("audio/mpeg", ".mp3"),
    ("audio/ogg", ".ogg"),
    ("audio/x-wav", ".wav"),
    ("image/gif", ".gif"),
    ("image/jpeg", ".jpg"),
    ("image/jpeg", ".jpeg"),
    ("image/png", ".png"),
    ("image/svg+xml", ".svg"),
    ("image/tiff", ".tiff"),
    ("message/rfc822", ".eml"),
    ("text/csv", ".csv"),
    ("text/html", ".html"),
    ("text/html", ".htm"),
    ("text/markdown", ".md"),
    ("text/plain", ".txt"),
    ("text/plain", ".text"),
    ("text/plain", ".log"),
    ("text/x-python", ".py"),
    ("text/x-rust", ".rs"),
    ("video/mp4", ".mp4"),
];

/// Guesses a file extension (with leading dot) for a content type.
///
/// Parameters after `;` are ignored.
#[must_use]
pub fn guess_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Guesses a content type from a file name's extension.
#[must_use]
pub fn guess_type(path: impl AsRef<Path>) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?;
    TYPES
        .iter()
        .find(|(_, known)| known[1..].eq_ignore_ascii_case(ext))
        .map(|(mime, _)| *mime)
}
