//! MIME message serialization.

use crate::error::{Error, Result};
use crate::message::{Body, Message};

impl Message {
    /// Serializes the tree into its wire form with LF line endings.
    ///
    /// Every multipart body is closed by `--boundary--` followed by a
    /// newline, before any epilogue.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart node has no boundary or no parts.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Appends the serialized tree to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart node has no boundary or no parts.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        self.headers.write_to(out);
        out.push(b'\n');

        let multipart = match &self.body {
            Body::Leaf(body) => {
                out.extend_from_slice(body);
                return Ok(());
            }
            Body::Multipart(multipart) => multipart,
        };

        let boundary = self.boundary().ok_or(Error::MissingBoundary)?;
        if multipart.parts.is_empty() {
            return Err(Error::InvalidMultipart(format!(
                "multipart with boundary {boundary:?} has no parts"
            )));
        }

        if let Some(preamble) = &multipart.preamble {
            out.extend_from_slice(preamble);
            out.push(b'\n');
        }

        for (idx, part) in multipart.parts.iter().enumerate() {
            if idx > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(b"--");
            out.extend_from_slice(boundary.as_bytes());
            out.push(b'\n');
            part.write_to(out)?;
        }

        out.extend_from_slice(b"\n--");
        out.extend_from_slice(boundary.as_bytes());
        out.extend_from_slice(b"--\n");

        if let Some(epilogue) = &multipart.epilogue {
            out.extend_from_slice(epilogue);
        }

        Ok(())
    }
}
