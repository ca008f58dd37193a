//! Prompt templates.
//!
//! Templates reference the column labels through `{reference}`, `{cartons}`,
//! `{quantity}` and `{check}` placeholders so a changed label set is
//! reflected in what the model is asked to produce.

use std::path::Path;

use crate::error::{ExtractionError, Result};
use crate::types::table::ColumnLabels;

const DEFAULT_TABLE_PROMPT: &str = r#"Tu es un assistant logistique. Le document fourni est un bon de livraison (scan, photo ou tableau brut).

Objectif :
1. Repérer le total des quantités annoncé par le document.
2. Reconstituer une ligne par référence avec les colonnes :
   - {reference}
   - {cartons}
   - {quantity}
   - {check}
3. Terminer par une ligne "Total / 合计" reprenant le total annoncé.
4. Répondre uniquement avec ce JSON, sans commentaire :
[
  {"{reference}": "REF-001", "{cartons}": 1, "{quantity}": 108, "{check}": ""},
  {"{reference}": "REF-002", "{cartons}": 2, "{quantity}": 50, "{check}": ""},
  {"{reference}": "Total / 合计", "{cartons}": 3, "{quantity}": 158, "{check}": ""}
]"#;

const DEFAULT_TOTAL_PROMPT: &str = r#"Le document fourni est un bon de livraison.
Donne uniquement le total des quantités de produits tel qu'il est écrit sur le document, sans le recalculer.
Si aucun total n'est écrit, mets null comme valeur.
Réponds avec ce JSON : {"total": 158}"#;

/// A prompt with column placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_PROMPT)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Load a template from a UTF-8 text file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let template = std::fs::read_to_string(path).map_err(|source| ExtractionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if template.trim().is_empty() {
            return Err(ExtractionError::Config(format!(
                "prompt file {} is empty",
                path.display()
            )));
        }
        Ok(Self::new(template))
    }

    /// Substitute the column labels.
    pub fn render(&self, labels: &ColumnLabels) -> String {
        self.template
            .replace("{reference}", &labels.reference)
            .replace("{cartons}", &labels.cartons)
            .replace("{quantity}", &labels.quantity)
            .replace("{check}", &labels.check)
    }
}

/// Prompt for the dedicated declared-total call.
pub fn total_prompt() -> &'static str {
    DEFAULT_TOTAL_PROMPT
}

/// Prompt for spreadsheet content sent as text.
pub fn with_text_input(prompt: &str, text: &str) -> String {
    format!("{}\n\n{}", prompt, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_uses_labels() {
        let prompt = PromptTemplate::default().render(&ColumnLabels::default());

        assert!(prompt.contains("Nombre de produits / 产品数量"));
        assert!(prompt.contains("\"Référence produit / 产品参考\": \"Total / 合计\""));
        assert!(!prompt.contains("{quantity}"));
    }

    #[test]
    fn test_custom_labels() {
        let labels = ColumnLabels {
            reference: "Ref".into(),
            cartons: "Boxes".into(),
            quantity: "Qty".into(),
            check: "Check".into(),
        };
        let prompt = PromptTemplate::new("{reference}|{cartons}|{quantity}|{check}").render(&labels);
        assert_eq!(prompt, "Ref|Boxes|Qty|Check");
    }

    #[test]
    fn test_example_in_default_prompt_is_valid_json() {
        let prompt = PromptTemplate::default().render(&ColumnLabels::default());
        let rows = crate::pipeline::parse::parse_rows(&prompt, &ColumnLabels::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Colonnes : {reference}, {quantity}").unwrap();

        let prompt = PromptTemplate::from_file(&path).unwrap().render(&ColumnLabels::default());
        assert_eq!(
            prompt,
            "Colonnes : Référence produit / 产品参考, Nombre de produits / 产品数量"
        );
    }

    #[test]
    fn test_empty_template_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "  \n").unwrap();

        assert!(matches!(
            PromptTemplate::from_file(&path),
            Err(ExtractionError::Config(_))
        ));
    }

    #[test]
    fn test_text_input_joined_with_blank_line() {
        assert_eq!(with_text_input("P", "a\tb"), "P\n\na\tb");
    }

    #[test]
    fn test_total_prompt_example_parses() {
        assert_eq!(
            crate::pipeline::parse::parse_declared_total(total_prompt()).unwrap(),
            Some(158.0)
        );
    }
}
