//! Materialization of recovered message parts.
//!
//! [`unpack`] walks a message tree in document order and hands every leaf
//! to a [`Destination`]. Composite nodes are never written themselves.
//! [`unpack_all`] decodes every leaf before writing the first one, so a
//! part that fails to decode leaves the destination untouched.

use crate::error::Result;
use mimeseal_mime::Message;
use mimeseal_mime::mime_types::guess_extension;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Extension for parts whose content type maps to nothing known.
const DEFAULT_EXTENSION: &str = ".bin";

/// Where unpacked parts are written.
pub trait Destination {
    /// Writes one part and returns the file it landed in, if any.
    ///
    /// `filename` is already reduced to a bare file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the part cannot be written.
    fn write_part(&mut self, filename: &str, data: &[u8]) -> io::Result<Option<PathBuf>>;
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn write_part(&mut self, filename: &str, data: &[u8]) -> io::Result<Option<PathBuf>> {
        (**self).write_part(filename, data)
    }
}

/// Writes each part to a file directly inside a directory.
///
/// A later part with the same name replaces the earlier file. An existing
/// entry of that name, symlinks included, is removed and a fresh file is
/// created in its place.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    /// Uses `root`, creating it and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory parts are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Destination for Directory {
    fn write_part(&mut self, filename: &str, data: &[u8]) -> io::Result<Option<PathBuf>> {
        let path = self.root.join(filename);
        match fs::symlink_metadata(&path) {
            Ok(_) => fs::remove_file(&path)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(data)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Wrote part");
        Ok(Some(path))
    }
}

/// Writes every part to a stream, each preceded by a banner line naming it.
#[derive(Debug)]
pub struct Stream<W> {
    writer: W,
}

impl<W: Write> Stream<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Destination for Stream<W> {
    fn write_part(&mut self, filename: &str, data: &[u8]) -> io::Result<Option<PathBuf>> {
        write!(
            self.writer,
            "\n----------\nAttached file {filename} with content:\n"
        )?;
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(None)
    }
}

/// One leaf written by [`Unpack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedPart {
    /// Bare file name the part was written under.
    pub filename: String,
    /// `type/subtype` of the part.
    pub content_type: String,
    /// Transfer-decoded content.
    pub data: Vec<u8>,
    /// File written, for file-backed destinations.
    pub path: Option<PathBuf>,
}

/// Lazy, single-pass iterator over the leaves of a message.
///
/// Every leaf advances the sequence number used for `part-NNN` names,
/// whether or not it declares a file name of its own.
pub struct Unpack<'a, D> {
    walk: mimeseal_mime::Walk<'a>,
    destination: D,
    counter: usize,
}

impl<D> Unpack<'_, D> {
    /// Returns the destination, e.g. to recover a [`Stream`]'s writer.
    pub fn into_destination(self) -> D {
        self.destination
    }
}

impl<D: Destination> Iterator for Unpack<'_, D> {
    type Item = Result<UnpackedPart>;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.walk.by_ref().find(|part| !part.is_multipart())?;
        self.counter += 1;
        Some(self.materialize(part))
    }
}

impl<D: Destination> Unpack<'_, D> {
    fn materialize(&mut self, part: &Message) -> Result<UnpackedPart> {
        let content_type = part.content_type_or_default().essence();
        let filename = part
            .filename()
            .as_deref()
            .and_then(safe_filename)
            .unwrap_or_else(|| fallback_filename(self.counter, &content_type));

        let data = part.decode_body()?;
        let path = self.destination.write_part(&filename, &data)?;

        Ok(UnpackedPart {
            filename,
            content_type,
            data,
            path,
        })
    }
}

/// Unpacks every leaf of `message` into `destination`.
///
/// Nothing is written until the returned iterator is advanced.
pub fn unpack<D: Destination>(message: &Message, destination: D) -> Unpack<'_, D> {
    Unpack {
        walk: message.walk(),
        destination,
        counter: 0,
    }
}

/// Unpacks every leaf of `message` into `destination`, all or nothing.
///
/// Every leaf is decoded first; the destination sees no writes unless all
/// of them succeed.
///
/// # Errors
///
/// Returns the first decoding error, or the first error from the
/// destination.
pub fn unpack_all<D: Destination>(
    message: &Message,
    mut destination: D,
) -> Result<Vec<UnpackedPart>> {
    let mut parts = unpack(message, Discard).collect::<Result<Vec<_>>>()?;
    for part in &mut parts {
        part.path = destination.write_part(&part.filename, &part.data)?;
    }
    Ok(parts)
}

/// Accepts every part and stores nothing.
struct Discard;

impl Destination for Discard {
    fn write_part(&mut self, _: &str, _: &[u8]) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Reduces a declared file name to its last path component.
///
/// Both `/` and `\` count as separators. Names that end up empty, `.`,
/// `..` or containing NUL are refused.
fn safe_filename(declared: &str) -> Option<String> {
    let base = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        tracing::debug!(declared, "Ignoring unusable file name");
        return None;
    }
    Some(base.to_string())
}

fn fallback_filename(counter: usize, content_type: &str) -> String {
    let extension = guess_extension(content_type).unwrap_or(DEFAULT_EXTENSION);
    format!("part-{counter:03}{extension}")
}
