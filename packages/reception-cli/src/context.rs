//! Application context: configuration, extractor construction and output helpers

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use delivery_notes::ai::OpenAIVision;
use delivery_notes::render::PdfiumRenderer;
use delivery_notes::security::ApiCredentials;
use delivery_notes::{ExtractionError, Extractor, ExtractorConfig, PageImage, PageRenderer};
use tracing::warn;

/// Command-line settings that override the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub require_consistent: bool,
    pub separate_total: bool,
}

/// PDF renderer that reports a missing pdfium library only when a PDF
/// actually needs rendering.
pub enum CliRenderer {
    Pdfium(PdfiumRenderer),
    Unavailable(String),
}

impl PageRenderer for CliRenderer {
    fn render(&self, pdf: &[u8]) -> delivery_notes::Result<Vec<PageImage>> {
        match self {
            CliRenderer::Pdfium(renderer) => renderer.render(pdf),
            CliRenderer::Unavailable(reason) => Err(ExtractionError::Render(reason.clone())),
        }
    }
}

pub type CliExtractor = Extractor<OpenAIVision, CliRenderer>;

/// Application context passed to all commands
pub struct AppContext {
    pub config: ExtractorConfig,
}

impl AppContext {
    /// Load the config file, then apply `RECEPTION_MODEL` and command-line overrides.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = ExtractorConfig::load(config_path).context("Failed to load configuration")?;

        if let Some(model) = std::env::var("RECEPTION_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
        {
            config.model = model;
        }
        apply_overrides(&mut config, overrides);

        config.validate().context("Invalid configuration")?;
        Ok(Self { config })
    }

    /// Build an extractor from the environment credentials.
    pub fn extractor(&self) -> Result<CliExtractor> {
        let credentials = ApiCredentials::from_env().context("Missing OpenAI credentials")?;
        let model = OpenAIVision::from_credentials(&credentials, &self.config);

        let renderer = match PdfiumRenderer::new(self.config.dpi) {
            Ok(renderer) => CliRenderer::Pdfium(renderer),
            Err(e) => {
                warn!(error = %e, "pdfium unavailable, PDF input disabled");
                CliRenderer::Unavailable(e.to_string())
            }
        };

        Ok(Extractor::new(model, renderer, self.config.clone())?)
    }

    pub fn print_header(&self, msg: &str) {
        println!();
        println!("{}", style(msg).bold());
    }

    pub fn print_success(&self, msg: &str) {
        println!("{}", style(msg).green());
    }

    pub fn print_warning(&self, msg: &str) {
        println!("{}", style(msg).yellow());
    }

    pub fn print_error(&self, msg: &str) {
        println!("{}", style(msg).red());
    }

    pub fn print_info(&self, msg: &str) {
        println!("{}", style(msg).cyan());
    }
}

fn apply_overrides(config: &mut ExtractorConfig, overrides: Overrides) {
    if let Some(model) = overrides.model {
        config.model = model;
    }
    if let Some(attempts) = overrides.max_attempts {
        config.retry.max_attempts = attempts;
    }
    config.require_consistent_total |= overrides.require_consistent;
    config.separate_total_call |= overrides.separate_total;
}
