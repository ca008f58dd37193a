//! In-memory session holding the last analyzed document.
//!
//! Analyzing the same file twice reuses the previous report unless a re-run
//! is requested, so exports and repeated menu actions do not trigger new
//! model calls.

use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::extract::{ExtractionReport, Extractor};
use crate::traits::model::VisionModel;
use crate::traits::renderer::PageRenderer;
use crate::types::document::Document;

/// Result of [`Session::analyze`].
#[derive(Debug, Clone, Copy)]
pub struct Analysis<'a> {
    pub report: &'a ExtractionReport,
    /// True when the report came from the cache
    pub cached: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    last: Option<ExtractionReport>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `document`, reusing the cached report when the fingerprint
    /// matches and `rerun` is false.
    ///
    /// A failed run leaves the previous report in place.
    pub async fn analyze<M, R>(
        &mut self,
        extractor: &Extractor<M, R>,
        document: &Document,
        rerun: bool,
    ) -> Result<Analysis<'_>>
    where
        M: VisionModel,
        R: PageRenderer,
    {
        let hit = !rerun
            && self
                .last
                .as_ref()
                .is_some_and(|r| r.fingerprint == document.fingerprint());

        let report = match self.last.take() {
            Some(report) if hit => {
                debug!(fingerprint = %document.fingerprint(), "Reusing cached report");
                report
            }
            previous => match extractor.process(document).await {
                Ok(report) => {
                    info!(
                        document = %report.document_name,
                        fingerprint = %report.fingerprint,
                        "Stored report in session"
                    );
                    report
                }
                Err(e) => {
                    self.last = previous;
                    return Err(e);
                }
            },
        };

        Ok(Analysis {
            report: self.last.insert(report),
            cached: hit,
        })
    }

    /// The last report, if any.
    pub fn current(&self) -> Option<&ExtractionReport> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
