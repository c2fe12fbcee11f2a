//! Request body state and multipart framing.

use bytes::Bytes;
use rand::RngCore;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// The body a builder will send. The most recent body call decides the
/// variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BodyContent {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes, sent without a content type of their own.
    Raw(Bytes),
    /// JSON text.
    Json(String),
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    /// Encode the builder's file list as `multipart/form-data`.
    Multipart,
    /// A body call whose value could not be encoded. Reported when the
    /// request is resolved.
    Unencodable(String),
}

/// Where the bytes of an uploaded file come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    /// Read from disk when the request is resolved.
    Path(PathBuf),
    /// In-memory contents.
    Bytes(Bytes),
}

impl FileSource {
    /// A file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// In-memory contents.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes(data.into())
    }

    pub(crate) async fn read(&self) -> Result<Bytes> {
        match self {
            Self::Bytes(data) => Ok(data.clone()),
            Self::Path(path) => tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
                Error::encoding(format!("failed to read file {}: {e}", path.display()))
            }),
        }
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Bytes> for FileSource {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

/// One file upload: a single part of a multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field_name: String,
    pub filename: String,
    pub source: FileSource,
}

/// Writer for `multipart/form-data` bodies (RFC 7578 framing over RFC 2046).
pub struct MultipartWriter {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartWriter {
    /// Create a writer with a random 60-character hex boundary.
    pub fn new() -> Self {
        let mut raw = [0u8; 30];
        rand::thread_rng().fill_bytes(&mut raw);
        let boundary: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        Self::with_boundary(boundary)
    }

    /// Create a writer with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buf: Vec::new(),
        }
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value announcing this writer's boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Append one file part.
    pub fn file_part(&mut self, field_name: &str, filename: &str, data: &[u8]) {
        if !self.buf.is_empty() {
            self.buf.extend_from_slice(b"\r\n");
        }
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"\r\n");

        let disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            escape_quotes(field_name),
            escape_quotes(filename)
        );
        self.buf.extend_from_slice(disposition.as_bytes());
        self.buf.extend_from_slice(b"Content-Type: ");
        self.buf.extend_from_slice(CONTENT_TYPE_OCTET_STREAM.as_bytes());
        self.buf.extend_from_slice(b"\r\n\r\n");
        self.buf.extend_from_slice(data);
    }

    /// Write the closing delimiter and return the framed body.
    pub fn finish(mut self) -> Bytes {
        if !self.buf.is_empty() {
            self.buf.extend_from_slice(b"\r\n");
        }
        self.buf.extend_from_slice(b"--");
        self.buf.extend_from_slice(self.boundary.as_bytes());
        self.buf.extend_from_slice(b"--\r\n");
        Bytes::from(self.buf)
    }
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MultipartWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartWriter")
            .field("boundary", &self.boundary)
            .field("len", &self.buf.len())
            .finish()
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Read every file part in order and frame them into one body.
///
/// Returns the content type (with boundary) and the body bytes.
pub(crate) async fn encode_multipart(files: &[FilePart]) -> Result<(String, Bytes)> {
    let mut writer = MultipartWriter::new();
    for part in files {
        let data = part.source.read().await?;
        writer.file_part(&part.field_name, &part.filename, &data);
    }
    Ok((writer.content_type(), writer.finish()))
}
