//! Uploaded documents and the inputs derived from them.

use std::fmt;
use std::path::Path;

use crate::error::{ExtractionError, Result};

/// Detected document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
    /// XLS or XLSX workbook
    Spreadsheet,
}

impl DocumentKind {
    /// Detect from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "xls" | "xlsx" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Detect from the leading bytes of the file.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        const OLE2: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(PNG) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(OLE2) {
            Some(Self::Spreadsheet)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Spreadsheet => "spreadsheet",
        };
        f.write_str(name)
    }
}

/// A document submitted for extraction.
#[derive(Clone)]
pub struct Document {
    name: String,
    bytes: Vec<u8>,
    kind: DocumentKind,
    fingerprint: String,
}

impl Document {
    /// Build a document from raw bytes and its original file name.
    ///
    /// The extension decides the kind; magic bytes are the fallback when
    /// the name carries no known extension.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let kind = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentKind::from_extension)
            .or_else(|| DocumentKind::sniff(&bytes))
            .ok_or_else(|| ExtractionError::UnsupportedFormat { name: name.clone() })?;

        let fingerprint = format!("{:x}", md5::compute(&bytes));

        Ok(Self {
            name,
            bytes,
            kind,
            fingerprint,
        })
    }

    /// Read a document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// MD5 of the content, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// A rendered page, PNG encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number
    pub number: usize,
    pub png: Vec<u8>,
}

impl PageImage {
    pub fn new(number: usize, png: Vec<u8>) -> Self {
        Self { number, png }
    }
}

impl fmt::Debug for PageImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageImage")
            .field("number", &self.number)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// What the model receives for a document.
#[derive(Debug, Clone)]
pub enum ModelInput {
    /// One image per page
    Pages(Vec<PageImage>),
    /// Tab-separated spreadsheet content
    Text(String),
}
