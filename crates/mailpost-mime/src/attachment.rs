//! File attachments and their encoded body parts.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::encoding::encode_base64;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::node::ContentNode;
use crate::sniff::{SNIFF_LENGTH, sniff};

/// A file attached to a message.
///
/// The file is only read when the message is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
    content_id: Option<String>,
}

impl Attachment {
    /// Creates an attachment whose display name is the base name of `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned();
        Self {
            path,
            file_name,
            content_type: None,
            content_id: None,
        }
    }

    /// Sets an explicit content type, skipping detection.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the content-ID used for inline references.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Overrides the display file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Returns the source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the display file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the content type, if set or already detected.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the content-ID, if any.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Detects and stores the content type from the first bytes of the
    /// file. Does nothing when a type is already known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened or read.
    pub fn resolve_content_type(&mut self) -> Result<&str> {
        if self.content_type.is_none() {
            let head = self.read_head().map_err(|source| Error::Io {
                path: self.path.clone(),
                source,
            })?;
            let detected = sniff(&head);
            tracing::debug!(
                path = %self.path.display(),
                content_type = detected,
                "Detected attachment type"
            );
            self.content_type = Some(detected.to_string());
        }
        Ok(self.content_type.as_deref().unwrap_or_default())
    }

    fn read_head(&self) -> std::io::Result<Vec<u8>> {
        let mut head = Vec::with_capacity(SNIFF_LENGTH);
        File::open(&self.path)?
            .take(SNIFF_LENGTH as u64)
            .read_to_end(&mut head)?;
        Ok(head)
    }

    /// Reads the file and builds its base64 body part.
    ///
    /// Content types must have been resolved beforehand; an unresolved
    /// attachment is sniffed from the bytes just read without caching.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn encode(&self) -> Result<ContentNode> {
        let data = std::fs::read(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        let content_type = self
            .content_type
            .as_deref()
            .unwrap_or_else(|| sniff(&data));

        let mut headers = Headers::new()
            .with(
                "Content-Type",
                format!("{content_type}; name=\"{}\"", self.file_name),
            )
            .with("Content-Transfer-Encoding", "base64")
            .with(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.file_name),
            );
        if let Some(id) = &self.content_id {
            headers.add("Content-ID", id.clone());
        }

        Ok(ContentNode::leaf(headers, encode_base64(&data)))
    }
}

/// Encodes every attachment in order.
///
/// # Errors
///
/// Returns the first [`Error::Io`] encountered; no partial list is returned.
pub fn encode_attachments(attachments: &[Attachment]) -> Result<Vec<ContentNode>> {
    attachments.iter().map(Attachment::encode).collect()
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
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_file_name_from_path() {
        let attachment = Attachment::new("/var/tmp/report.pdf");
        assert_eq!(attachment.file_name(), "report.pdf");
        assert_eq!(attachment.path(), Path::new("/var/tmp/report.pdf"));
    }

    #[test]
    fn test_encode_headers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "hello.txt", b"Hello, World!");
        let attachment = Attachment::new(&path)
            .with_content_type("text/plain")
            .with_content_id("CID1");

        let node = attachment.encode().unwrap();
        let names: Vec<&str> = node.headers().iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            [
                "Content-Type",
                "Content-Transfer-Encoding",
                "Content-Disposition",
                "Content-ID"
            ]
        );
        assert_eq!(
            node.headers().get("Content-Type"),
            Some("text/plain; name=\"hello.txt\"")
        );
        assert_eq!(
            node.headers().get("Content-Disposition"),
            Some("attachment; filename=\"hello.txt\"")
        );
        assert_eq!(node.headers().get("Content-ID"), Some("CID1"));
        let ContentNode::Leaf { text, .. } = node else {
            panic!("attachment must be a leaf");
        };
        assert_eq!(text, "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_encode_without_content_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.bin", b"\x00\x01");
        let node = Attachment::new(&path).encode().unwrap();
        assert!(node.headers().get("Content-ID").is_none());
        assert_eq!(
            node.headers().get("Content-Type"),
            Some("application/octet-stream; name=\"a.bin\"")
        );
    }

    #[test]
    fn test_resolve_content_type_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "page.html", b"<html><body>hi</body></html>");
        let mut attachment = Attachment::new(&path);

        assert_eq!(
            attachment.resolve_content_type().unwrap(),
            "text/html; charset=utf-8"
        );

        std::fs::write(&path, b"%PDF-1.4").unwrap();
        assert_eq!(
            attachment.resolve_content_type().unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_explicit_type_skips_detection() {
        let mut attachment = Attachment::new("/does/not/exist.bin").with_content_type("image/png");
        assert_eq!(attachment.resolve_content_type().unwrap(), "image/png");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let attachment = Attachment::new("/does/not/exist.bin");
        let err = attachment.encode().unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_encode_attachments_stops_at_first_error() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.txt", b"ok");
        let attachments = vec![
            Attachment::new(&good),
            Attachment::new(dir.path().join("missing.txt")),
        ];
        assert!(encode_attachments(&attachments).is_err());
        assert_eq!(encode_attachments(&attachments[..1]).unwrap().len(), 1);
    }
}
