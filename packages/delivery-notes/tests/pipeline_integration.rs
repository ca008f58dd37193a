//! Integration tests for the extraction pipeline.
//!
//! These run whole documents through `Extractor` with a scripted model:
//! 1. Prepare input (rendered pages or sheet text)
//! 2. Call the model with retries
//! 3. Parse and concatenate rows
//! 4. Reconcile and export

use delivery_notes::{
    export::{read_table, write_csv, write_xlsx},
    testing::{MockModel, MockRenderer},
    ColumnLabels, DeliveryLine, DeliveryTable, Document, ExtractionError, Extractor,
    ExtractorConfig, ReconcileStatus, RetryPolicy,
};
use openai_client::OpenAIError;
use serde_json::json;

/// Helper to build a model reply with the default column labels.
fn reply(lines: &[(&str, f64)]) -> String {
    let labels = ColumnLabels::default();
    let rows: Vec<_> = lines
        .iter()
        .map(|(reference, quantity)| {
            json!({
                labels.reference.as_str(): reference,
                labels.cartons.as_str(): null,
                labels.quantity.as_str(): quantity,
                labels.check.as_str(): "",
            })
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap()
}

/// Helper wrapping a reply in the prose a chat model usually adds.
fn chatty(body: &str) -> String {
    format!("Voici le tableau extrait :\n```json\n{}\n```\nN'hésitez pas si besoin.", body)
}

fn config() -> ExtractorConfig {
    ExtractorConfig {
        retry: RetryPolicy::immediate(4),
        ..Default::default()
    }
}

fn pdf() -> Document {
    Document::from_bytes("bon_livraison.pdf", b"%PDF-1.7 delivery".to_vec()).unwrap()
}

#[tokio::test]
async fn test_consistent_total_end_to_end() {
    let model = MockModel::new().with_reply(chatty(&reply(&[
        ("A", 108.0),
        ("B", 50.0),
        ("Total", 158.0),
    ])));
    let extractor = Extractor::new(model, MockRenderer::new(1), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.table.len(), 3);
    assert_eq!(report.reconciliation.computed, 158.0);
    assert_eq!(report.reconciliation.declared, Some(158.0));
    assert!(report.reconciliation.is_consistent());
    assert_eq!(report.reconciliation.message(), "Total cohérent : 158 produits");
    assert_eq!(report.fingerprint, pdf().fingerprint());
}

#[tokio::test]
async fn test_declared_total_mismatch() {
    let model = MockModel::new().with_reply(reply(&[("A", 108.0), ("B", 50.0), ("Total", 160.0)]));
    let extractor = Extractor::new(model, MockRenderer::new(1), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(
        report.reconciliation.status,
        ReconcileStatus::Mismatch { difference: 2.0 }
    );
    assert_eq!(
        report.reconciliation.message(),
        "Incohérence entre total annoncé (160) et total calculé (158)"
    );
}

#[tokio::test]
async fn test_garbage_replies_are_retried() {
    let model = MockModel::new()
        .with_reply("Je ne peux pas lire ce document.")
        .with_reply(r#"{"erreur": "image floue"}"#)
        .with_reply(reply(&[("A", 108.0), ("B", 50.0)]));
    let extractor = Extractor::new(model.clone(), MockRenderer::new(1), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(report.table.len(), 2);
    assert_eq!(report.reconciliation.status, ReconcileStatus::NoDeclaredTotal);
    assert_eq!(model.calls().len(), 3);
}

#[tokio::test]
async fn test_transient_api_errors_are_retried() {
    let model = MockModel::new()
        .with_error(OpenAIError::Api {
            status: 429,
            message: "rate limited".into(),
        })
        .with_error(OpenAIError::Network("connection reset".into()))
        .with_reply(reply(&[("A", 1.0)]));
    let extractor = Extractor::new(model, MockRenderer::new(1), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();
    assert_eq!(report.attempts, 3);
}

#[tokio::test]
async fn test_pages_concatenate_in_order() {
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0), ("B", 20.0)]))
        .with_reply(reply(&[("C", 30.0), ("Total", 158.0)]));
    let extractor = Extractor::new(model.clone(), MockRenderer::new(2), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    let references: Vec<&str> = report
        .table
        .lines()
        .iter()
        .map(|l| l.reference.as_str())
        .collect();
    assert_eq!(references, vec!["A", "B", "C", "Total"]);

    let pages: Vec<Option<usize>> = report.table.lines().iter().map(|l| l.source_page).collect();
    assert_eq!(pages, vec![Some(1), Some(1), Some(2), Some(2)]);

    assert!(report.reconciliation.is_consistent());
    let calls = model.calls();
    assert_eq!(calls[0].pages, vec![1]);
    assert_eq!(calls[1].pages, vec![2]);
}

#[tokio::test]
async fn test_failed_page_is_recorded_and_skipped() {
    let model = MockModel::new()
        .with_error(OpenAIError::Api {
            status: 401,
            message: "invalid api key".into(),
        })
        .with_reply(reply(&[("C", 30.0)]));
    let extractor = Extractor::new(model, MockRenderer::new(2), config()).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].pages, vec![1]);
    assert_eq!(report.failures[0].attempts, 1);
    assert!(report.failures[0].message.contains("401"));
    assert_eq!(report.table.len(), 1);
}

#[tokio::test]
async fn test_require_consistent_total_retries_mismatch() {
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0), ("B", 50.0), ("Total", 160.0)]))
        .with_reply(reply(&[("A", 110.0), ("B", 50.0), ("Total", 160.0)]));
    let config = ExtractorConfig {
        require_consistent_total: true,
        ..config()
    };
    let extractor = Extractor::new(model, MockRenderer::new(1), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.attempts, 2);
    assert!(report.reconciliation.is_consistent());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_require_consistent_total_keeps_last_reply() {
    let mismatch = reply(&[("A", 108.0), ("B", 50.0), ("Total", 160.0)]);
    let model = MockModel::new()
        .with_reply(mismatch.clone())
        .with_reply(mismatch);
    let config = ExtractorConfig {
        require_consistent_total: true,
        retry: RetryPolicy::immediate(2),
        ..Default::default()
    };
    let extractor = Extractor::new(model, MockRenderer::new(1), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.attempts, 2);
    assert!(report.reconciliation.is_mismatch());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("page 1"));
}

#[tokio::test]
async fn test_require_consistent_total_checks_the_whole_document() {
    // The Total row on page 2 covers page 1 too
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0)]))
        .with_reply(reply(&[("B", 50.0), ("Total", 158.0)]));
    let config = ExtractorConfig {
        require_consistent_total: true,
        pages_per_call: 1,
        retry: RetryPolicy::immediate(6),
        ..Default::default()
    };
    let extractor = Extractor::new(model.clone(), MockRenderer::new(2), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(model.calls().len(), 2);
    assert!(report.warnings.is_empty());
    assert!(report.reconciliation.is_consistent());
}

#[tokio::test]
async fn test_require_consistent_total_retries_last_page_against_earlier_rows() {
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0)]))
        .with_reply(reply(&[("B", 50.0), ("Total", 160.0)]))
        .with_reply(reply(&[("B", 52.0), ("Total", 160.0)]));
    let config = ExtractorConfig {
        require_consistent_total: true,
        pages_per_call: 1,
        retry: RetryPolicy::immediate(6),
        ..Default::default()
    };
    let extractor = Extractor::new(model.clone(), MockRenderer::new(2), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert!(report.warnings.is_empty());
    assert_eq!(report.reconciliation.computed, 160.0);
    assert!(report.reconciliation.is_consistent());

    let pages: Vec<_> = model.calls().iter().map(|c| c.pages.clone()).collect();
    assert_eq!(pages, vec![vec![1], vec![2], vec![2]]);
}

#[tokio::test]
async fn test_separate_total_call_overrides_table_total() {
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0), ("B", 50.0)]))
        .with_total(Some(160.0));
    let config = ExtractorConfig {
        separate_total_call: true,
        ..config()
    };
    let extractor = Extractor::new(model.clone(), MockRenderer::new(1), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.declared_by_model, Some(160.0));
    assert_eq!(report.reconciliation.declared, Some(160.0));
    assert!(report.reconciliation.is_mismatch());

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].total_request);
    assert_eq!(calls[1].pages, vec![1]);
}

#[tokio::test]
async fn test_separate_total_call_sees_every_page() {
    let model = MockModel::new()
        .with_reply(reply(&[("A", 108.0)]))
        .with_reply(reply(&[("B", 50.0), ("Total", 158.0)]))
        .with_total(Some(158.0));
    let config = ExtractorConfig {
        separate_total_call: true,
        pages_per_call: 1,
        ..config()
    };
    let extractor = Extractor::new(model.clone(), MockRenderer::new(2), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    let calls = model.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].total_request);
    assert_eq!(calls[2].pages, vec![1, 2]);
    assert_eq!(report.reconciliation.declared, Some(158.0));
    assert!(report.reconciliation.is_consistent());
}

#[tokio::test]
async fn test_separate_total_failure_becomes_warning() {
    let model = MockModel::new().with_reply(reply(&[("A", 108.0), ("Total", 108.0)]));
    let config = ExtractorConfig {
        separate_total_call: true,
        retry: RetryPolicy::immediate(2),
        ..Default::default()
    };
    let extractor = Extractor::new(model, MockRenderer::new(1), config).unwrap();

    let report = extractor.process(&pdf()).await.unwrap();

    assert_eq!(report.declared_by_model, None);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.reconciliation.is_consistent());
}

#[tokio::test]
async fn test_spreadsheet_sent_as_text() {
    let source = DeliveryTable::new(ColumnLabels::default()).with_lines([
        DeliveryLine::new("A-100", Some(108.0)),
        DeliveryLine::new("B-200", Some(50.0)),
    ]);
    let document = Document::from_bytes("commande.xlsx", write_xlsx(&source).unwrap()).unwrap();

    let model = MockModel::new().with_reply(reply(&[("A-100", 108.0), ("B-200", 50.0)]));
    let extractor = Extractor::new(model.clone(), MockRenderer::new(0), config()).unwrap();

    let report = extractor.process(&document).await.unwrap();

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].pages.is_empty());
    assert!(calls[0].prompt.contains("A-100\t\t108"));
    assert_eq!(report.table.lines()[0].source_page, None);
}

#[tokio::test]
async fn test_pdf_without_pages_fails() {
    let extractor = Extractor::new(MockModel::new(), MockRenderer::new(0), config()).unwrap();
    let err = extractor.process(&pdf()).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Render(_)));
}

#[test]
fn test_unsupported_document_rejected() {
    let err = Document::from_bytes("notes.docx", b"hello".to_vec()).unwrap_err();
    assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn test_exports_reconcile_like_the_report() {
    let model = MockModel::new().with_reply(reply(&[("A", 108.0), ("B", 50.0), ("Total", 160.0)]));
    let extractor = Extractor::new(model, MockRenderer::new(1), config()).unwrap();
    let report = extractor.process(&pdf()).await.unwrap();
    let labels = ColumnLabels::default();

    let from_xlsx = read_table(&write_xlsx(&report.table).unwrap(), "out.xlsx", &labels).unwrap();
    let from_csv = read_table(&write_csv(&report.table).unwrap(), "out.csv", &labels).unwrap();

    for table in [from_xlsx, from_csv] {
        let again = delivery_notes::pipeline::reconcile_table(&table, None);
        assert_eq!(again, delivery_notes::pipeline::reconcile_table(&report.table, None));
        assert_eq!(again.status, ReconcileStatus::Mismatch { difference: 2.0 });
    }
}
