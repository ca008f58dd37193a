//! Document-level extraction: prepare input, call the model per page group,
//! assemble the table and reconcile it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::ingest::prepare_input;
use crate::pipeline::parse::parse_rows;
use crate::pipeline::prompts::{total_prompt, with_text_input, PromptTemplate};
use crate::pipeline::reconcile::{reconcile_table, Reconciliation};
use crate::pipeline::retry::Outcome;
use crate::traits::model::VisionModel;
use crate::traits::renderer::PageRenderer;
use crate::types::config::ExtractorConfig;
use crate::types::document::{Document, ModelInput, PageImage};
use crate::types::table::DeliveryTable;

/// A page group that produced no rows after all attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFailure {
    /// Page numbers of the group; empty for spreadsheet input
    pub pages: Vec<usize>,
    pub message: String,
    pub attempts: u32,
}

impl PageFailure {
    /// "page 3", "pages 3-4" or "spreadsheet".
    pub fn label(&self) -> String {
        match self.pages.as_slice() {
            [] => "spreadsheet".to_string(),
            [single] => format!("page {}", single),
            [first, .., last] => format!("pages {}-{}", first, last),
        }
    }
}

/// Everything one run over a document produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub document_name: String,
    pub fingerprint: String,
    pub table: DeliveryTable,
    pub reconciliation: Reconciliation,
    /// Declared total returned by the dedicated call, when one ran
    pub declared_by_model: Option<f64>,
    pub failures: Vec<PageFailure>,
    /// Model calls made across all page groups
    pub attempts: u32,
    pub warnings: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

impl ExtractionReport {
    /// True when every page group produced rows.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One model call's worth of input.
struct Chunk {
    prompt: String,
    images: Vec<PageImage>,
    /// Sheet content for spreadsheet input
    sheet: Option<String>,
}

impl Chunk {
    fn pages(&self) -> Vec<usize> {
        self.images.iter().map(|p| p.number).collect()
    }

    fn first_page(&self) -> Option<usize> {
        self.images.first().map(|p| p.number)
    }
}

/// Runs the extraction pipeline for one model and one PDF renderer.
pub struct Extractor<M, R> {
    model: M,
    renderer: R,
    config: ExtractorConfig,
    prompt: PromptTemplate,
}

impl<M: VisionModel, R: PageRenderer> Extractor<M, R> {
    /// Validate `config` and load its prompt file, if any.
    pub fn new(model: M, renderer: R, config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        let prompt = match &config.prompt_file {
            Some(path) => PromptTemplate::from_file(path)?,
            None => PromptTemplate::default(),
        };

        Ok(Self {
            model,
            renderer,
            config,
            prompt,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Extract, assemble and reconcile the table of `document`.
    ///
    /// A page group that keeps failing is recorded and skipped. The run only
    /// fails as a whole when input preparation fails or no group yields a row.
    pub async fn process(&self, document: &Document) -> Result<ExtractionReport> {
        info!(
            document = %document.name(),
            kind = %document.kind(),
            fingerprint = %document.fingerprint(),
            "Processing delivery note"
        );

        let input = prepare_input(document, &self.renderer)?;
        let chunks = self.chunks(input);

        let mut table = DeliveryTable::new(self.config.columns.clone());
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        let mut attempts = 0;

        let last = chunks.len().saturating_sub(1);
        for (index, chunk) in chunks.iter().enumerate() {
            // A Total row states the whole document's total, so only the last
            // group is checked, against everything collected before it.
            let check_against = (self.config.require_consistent_total && index == last)
                .then_some(&table);
            let outcome = self
                .config
                .retry
                .run(|attempt| self.extract_chunk(chunk, check_against, attempt))
                .await;

            match outcome {
                Ok(done) => {
                    attempts += done.attempts;
                    if !done.satisfied {
                        warnings.push(format!(
                            "{}: total still inconsistent after {} attempts, keeping the last reply",
                            group_label(chunk),
                            done.attempts
                        ));
                    }
                    table.extend(done.value);
                }
                Err(exhausted) => {
                    attempts += exhausted.attempts;
                    let failure = PageFailure {
                        pages: chunk.pages(),
                        message: exhausted.error.to_string(),
                        attempts: exhausted.attempts,
                    };
                    warn!(
                        group = %failure.label(),
                        attempts = failure.attempts,
                        error = %failure.message,
                        "Page group failed"
                    );
                    failures.push(failure);
                }
            }
        }

        if table.is_empty() {
            return Err(ExtractionError::NothingExtracted { failures });
        }

        let declared_by_model = if self.config.separate_total_call {
            self.ask_declared_total(&chunks, &mut warnings).await
        } else {
            None
        };

        let reconciliation = reconcile_table(&table, declared_by_model);
        info!(
            document = %document.name(),
            lines = table.len(),
            failed_groups = failures.len(),
            attempts,
            result = %reconciliation.message(),
            "Extraction finished"
        );

        Ok(ExtractionReport {
            document_name: document.name().to_string(),
            fingerprint: document.fingerprint().to_string(),
            table,
            reconciliation,
            declared_by_model,
            failures,
            attempts,
            warnings,
            processed_at: Utc::now(),
        })
    }

    fn chunks(&self, input: ModelInput) -> Vec<Chunk> {
        let prompt = self.prompt.render(&self.config.columns);
        match input {
            ModelInput::Pages(pages) => pages
                .chunks(self.config.pages_per_call.max(1))
                .map(|group| Chunk {
                    prompt: prompt.clone(),
                    images: group.to_vec(),
                    sheet: None,
                })
                .collect(),
            ModelInput::Text(text) => vec![Chunk {
                prompt: with_text_input(&prompt, &text),
                images: Vec::new(),
                sheet: Some(text),
            }],
        }
    }

    /// Call the model for one group. With `check_against`, the rows gathered
    /// so far plus this group's rows must reconcile for the reply to count.
    async fn extract_chunk(
        &self,
        chunk: &Chunk,
        check_against: Option<&DeliveryTable>,
        attempt: u32,
    ) -> Result<Outcome<DeliveryTable>> {
        debug!(pages = ?chunk.pages(), attempt, "Calling model");
        let reply = self.model.complete(&chunk.prompt, &chunk.images).await?;
        let rows = parse_rows(&reply, &self.config.columns)?;
        let table = DeliveryTable::from_rows(&rows, &self.config.columns, chunk.first_page());

        if let Some(collected) = check_against {
            let mut combined = collected.clone();
            combined.extend(table.clone());
            let check = reconcile_table(&combined, None);
            if check.is_mismatch() {
                return Ok(Outcome::Unsatisfied(table, check.message()));
            }
        }
        Ok(Outcome::Done(table))
    }

    /// Dedicated call for the total the document declares, sent every page
    /// since the total usually sits at the end. Failure only costs the
    /// override, so it becomes a warning.
    async fn ask_declared_total(&self, chunks: &[Chunk], warnings: &mut Vec<String>) -> Option<f64> {
        let sheet = chunks.iter().find_map(|c| c.sheet.as_deref());
        let prompt = match sheet {
            Some(sheet) => with_text_input(total_prompt(), sheet),
            None => total_prompt().to_string(),
        };
        let images: Vec<PageImage> = chunks.iter().flat_map(|c| c.images.iter().cloned()).collect();

        let (model, prompt, images) = (&self.model, prompt.as_str(), images.as_slice());
        let result = self
            .config
            .retry
            .run(|_| async move { model.declared_total(prompt, images).await.map(Outcome::Done) })
            .await;

        match result {
            Ok(done) => {
                debug!(total = ?done.value, attempts = done.attempts, "Declared total call finished");
                done.value
            }
            Err(exhausted) => {
                warn!(error = %exhausted.error, "Declared total call failed");
                warnings.push(format!("declared total unavailable: {}", exhausted.error));
                None
            }
        }
    }
}

fn group_label(chunk: &Chunk) -> String {
    PageFailure {
        pages: chunk.pages(),
        message: String::new(),
        attempts: 0,
    }
    .label()
}
