//! Extractor configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) is valid.
//!
//! ```toml
//! model = "gpt-4o"
//! pages_per_call = 1
//! require_consistent_total = true
//!
//! [retry]
//! max_attempts = 6
//! initial_delay_ms = 500
//!
//! [columns]
//! quantity = "Qty"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};
use crate::pipeline::retry::RetryPolicy;
use crate::types::table::ColumnLabels;

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Chat model used for every call
    pub model: String,

    /// Completion budget per call
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// PDF rasterization resolution
    pub dpi: f32,

    /// Pages sent together in one call
    pub pages_per_call: usize,

    /// Attempt bounds and backoff
    pub retry: RetryPolicy,

    /// Retry a page group while its own total disagrees with its lines
    pub require_consistent_total: bool,

    /// Ask the model for the declared total in a dedicated call
    pub separate_total_call: bool,

    /// Column labels requested from the model and used in exports
    pub columns: ColumnLabels,

    /// Replacement prompt template
    pub prompt_file: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 1500,
            temperature: 0.0,
            dpi: 300.0,
            pages_per_call: 1,
            retry: RetryPolicy::default(),
            require_consistent_total: false,
            separate_total_call: false,
            columns: ColumnLabels::default(),
            prompt_file: None,
        }
    }
}

impl ExtractorConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| ExtractionError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    ///
    /// A relative `prompt_file` is resolved against the config file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ExtractionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml(&source)?;
        if let (Some(prompt), Some(dir)) = (&config.prompt_file, path.parent()) {
            if prompt.is_relative() {
                config.prompt_file = Some(dir.join(prompt));
            }
        }
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ExtractionError::Config("model must not be empty".into()));
        }
        if self.dpi.is_nan() || self.dpi <= 0.0 {
            return Err(ExtractionError::Config("dpi must be positive".into()));
        }
        if self.pages_per_call == 0 {
            return Err(ExtractionError::Config("pages_per_call must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.dpi, 300.0);
        assert_eq!(config.pages_per_call, 1);
        assert_eq!(config.retry.max_attempts, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ExtractorConfig::from_toml(
            r#"
            model = "gpt-4o-mini"
            require_consistent_total = true

            [retry]
            max_attempts = 3

            [columns]
            quantity = "Qty"
            "#,
        )
        .unwrap();

        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.require_consistent_total);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, RetryPolicy::default().initial_delay_ms);
        assert_eq!(config.columns.quantity, "Qty");
        assert_eq!(config.columns.reference, ColumnLabels::default().reference);
        assert_eq!(config.max_tokens, 1500);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ExtractorConfig::from_toml("model = [").unwrap_err();
        assert!(matches!(err, ExtractionError::Config(_)));
    }

    #[test]
    fn test_relative_prompt_file_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reception.toml");
        std::fs::write(&path, "prompt_file = \"prompt.txt\"\n").unwrap();

        let config = ExtractorConfig::from_file(&path).unwrap();
        assert_eq!(config.prompt_file, Some(dir.path().join("prompt.txt")));
    }

    #[test]
    fn test_validate_rejects_zero_pages_per_call() {
        let config = ExtractorConfig {
            pages_per_call: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ExtractionError::Config(_))));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(ExtractorConfig::load(None).unwrap(), ExtractorConfig::default());
    }
}
