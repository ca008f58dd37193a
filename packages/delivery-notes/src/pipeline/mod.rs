//! Extraction pipeline.
//!
//! - Ingest: document to page images or sheet text
//! - Prompts: table and declared-total instructions
//! - Retry: bounded attempts with backoff around each model call
//! - Parse: JSON block recovery from free-text replies
//! - Reconcile: computed sum against the declared total
//! - Extract: the document-level orchestration

pub mod extract;
pub mod ingest;
pub mod parse;
pub mod prompts;
pub mod reconcile;
pub mod retry;

pub use extract::{ExtractionReport, Extractor, PageFailure};
pub use ingest::{normalize_image, prepare_input, read_sheet_rows, spreadsheet_text};
pub use parse::{extract_json_block, parse_declared_total, parse_rows, BlockKind};
pub use prompts::{total_prompt, with_text_input, PromptTemplate};
pub use reconcile::{reconcile, reconcile_table, ReconcileStatus, Reconciliation};
pub use retry::{Attempted, Exhausted, Outcome, RetryPolicy};
