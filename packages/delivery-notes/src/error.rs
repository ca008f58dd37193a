//! Typed errors for the delivery-note library.
//!
//! Every failure a user can hit while reading a document, calling the model,
//! or exporting a table has its own variant so callers can show a precise
//! message and decide whether to try again.

use std::path::PathBuf;

use openai_client::OpenAIError;
use thiserror::Error;

use crate::pipeline::extract::PageFailure;

/// Errors that can occur while processing a delivery note.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Configuration error (missing API key, unreadable config file)
    #[error("config error: {0}")]
    Config(String),

    /// File type is not PDF, PNG, JPEG or XLS/XLSX
    #[error("unsupported file format: {name}")]
    UnsupportedFormat { name: String },

    /// File could not be read from disk
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PDF could not be loaded or rasterized
    #[error("PDF rendering failed: {0}")]
    Render(String),

    /// Image could not be decoded or encoded
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Spreadsheet could not be opened or has no worksheet
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Model call failed
    #[error("AI service error: {0}")]
    AI(#[from] OpenAIError),

    /// The model reply contains no bracketed or braced block
    #[error("no JSON found in model response")]
    NoJsonFound,

    /// The extracted block is not valid JSON
    #[error("JSON parse error: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON, but not a list of row objects
    #[error("unexpected JSON shape: {0}")]
    UnexpectedShape(String),

    /// Rows are missing required columns
    #[error("missing columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// No chunk of the document produced any row
    #[error("no rows extracted ({} failed page group(s))", failures.len())]
    NothingExtracted { failures: Vec<PageFailure> },

    /// XLSX writing failed
    #[error("export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Whether repeating the same model call may give a different outcome.
    ///
    /// Model output is non-deterministic, so every parse failure is worth
    /// another attempt. Transport errors defer to the client's own
    /// classification. Everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::AI(e) => e.is_retryable(),
            ExtractionError::NoJsonFound
            | ExtractionError::InvalidJson(_)
            | ExtractionError::UnexpectedShape(_)
            | ExtractionError::MissingColumns { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for delivery-note operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
