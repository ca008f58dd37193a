//! Delivery-Note Extraction Library
//!
//! Reads a supplier's delivery note (PDF, PNG, JPEG or XLS/XLSX), asks a
//! multimodal model to transcribe its product table, checks the line
//! quantities against the total the document declares and exports the
//! result as XLSX or CSV.
//!
//! # Usage
//!
//! ```rust,ignore
//! use delivery_notes::{Document, Extractor, ExtractorConfig};
//! use delivery_notes::ai::OpenAIVision;
//! use delivery_notes::render::PdfiumRenderer;
//! use delivery_notes::security::ApiCredentials;
//!
//! let config = ExtractorConfig::load(None)?;
//! let model = OpenAIVision::from_credentials(&ApiCredentials::from_env()?, &config);
//! let extractor = Extractor::new(model, PdfiumRenderer::new(config.dpi)?, config)?;
//!
//! let report = extractor.process(&Document::from_path("bon.pdf")?).await?;
//! println!("{}", report.reconciliation.message());
//! delivery_notes::export::save_xlsx(&report.table, "bon_de_livraison_corrige.xlsx")?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for the model and the PDF renderer
//! - [`types`] - Documents, tables and configuration
//! - [`pipeline`] - Ingestion, retries, parsing, reconciliation
//! - [`export`] - XLSX/CSV output and re-import
//! - [`session`] - Last-report cache for interactive use
//! - [`ai`] - OpenAI model implementation
//! - [`render`] - pdfium renderer
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod security;
pub mod session;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, Result};
pub use pipeline::{
    ExtractionReport, Extractor, PageFailure, ReconcileStatus, Reconciliation, RetryPolicy,
};
pub use session::{Analysis, Session};
pub use traits::{model::VisionModel, renderer::PageRenderer};
pub use types::{
    config::ExtractorConfig,
    document::{Document, DocumentKind, ModelInput, PageImage},
    table::{Cell, ColumnLabels, DeliveryLine, DeliveryTable},
};
