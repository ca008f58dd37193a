//! Interactive menu over one in-memory session

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use console::Term;
use delivery_notes::export::{save_csv, save_xlsx, DEFAULT_CSV_NAME, DEFAULT_XLSX_NAME};
use delivery_notes::{Document, ExtractionError, Session};
use dialoguer::{theme::ColorfulTheme, Input, Select};

use crate::context::{AppContext, CliExtractor};
use crate::display;

#[derive(Clone, Copy)]
enum Format {
    Xlsx,
    Csv,
}

struct State {
    extractor: CliExtractor,
    session: Session,
    document: Option<Document>,
}

pub async fn run(ctx: &AppContext, file: Option<PathBuf>) -> Result<()> {
    let term = Term::stdout();
    print_banner(&term)?;

    let mut state = State {
        extractor: ctx.extractor()?,
        session: Session::new(),
        document: None,
    };

    if let Some(path) = file {
        report(ctx, load(ctx, &mut state, &path));
    }

    loop {
        println!();
        let loaded = state
            .document
            .as_ref()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|| "aucun fichier".to_string());
        println!("{} {}", "📂".cyan(), loaded.dimmed());

        let options = vec![
            "🔍 Analyser le bon de livraison",
            "🔄 Relancer l'analyse",
            "📊 Exporter en XLSX",
            "📝 Exporter en CSV",
            "📂 Charger un autre fichier",
            "🚪 Quitter",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Que voulez-vous faire ?")
            .items(&options)
            .default(0)
            .interact_on(&term)?;

        let result = match selection {
            0 => analyze(&mut state, false).await,
            1 => analyze(&mut state, true).await,
            2 => export(ctx, &state, Format::Xlsx),
            3 => export(ctx, &state, Format::Csv),
            4 => ask_path("Chemin du fichier").and_then(|path| load(ctx, &mut state, &path)),
            5 => {
                println!("{}", "👋 Au revoir !".bright_blue());
                break;
            }
            _ => unreachable!(),
        };
        report(ctx, result);
    }

    Ok(())
}

fn print_banner(term: &Term) -> Result<()> {
    term.clear_screen()?;
    println!("{}", "╔════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║   Réception des bons de livraison      ║".bright_cyan());
    println!("{}", "╚════════════════════════════════════════╝".bright_cyan());
    Ok(())
}

/// Show a failed action without leaving the menu.
fn report(ctx: &AppContext, result: Result<()>) {
    if let Err(e) = result {
        if let Some(ExtractionError::NothingExtracted { failures }) =
            e.downcast_ref::<ExtractionError>()
        {
            display::print_failures(failures);
        }
        ctx.print_error(&format!("❌ {:#}", e));
    }
}

fn load(ctx: &AppContext, state: &mut State, path: &Path) -> Result<()> {
    let document = Document::from_path(path)
        .with_context(|| format!("Impossible de charger {}", path.display()))?;
    ctx.print_info(&format!("Fichier chargé : {} ({})", document.name(), document.kind()));
    state.document = Some(document);
    Ok(())
}

async fn analyze(state: &mut State, rerun: bool) -> Result<()> {
    let document = state
        .document
        .as_ref()
        .context("Aucun fichier chargé")?;

    println!("{}", "⏳ Analyse en cours...".bright_yellow());
    let analysis = state
        .session
        .analyze(&state.extractor, document, rerun)
        .await?;

    display::print_report(analysis.report, analysis.cached);
    Ok(())
}

fn export(ctx: &AppContext, state: &State, format: Format) -> Result<()> {
    let report = state
        .session
        .current()
        .context("Aucune analyse à exporter, lancez d'abord l'analyse")?;
    ensure_analyzed(&report.fingerprint, state.document.as_ref())?;

    let default = match format {
        Format::Xlsx => DEFAULT_XLSX_NAME,
        Format::Csv => DEFAULT_CSV_NAME,
    };
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Fichier de sortie pour {}", report.document_name))
        .default(default.to_string())
        .interact_text()?;

    match format {
        Format::Xlsx => save_xlsx(&report.table, &path)?,
        Format::Csv => save_csv(&report.table, &path)?,
    }
    ctx.print_success(&format!("✅ Exporté vers {}", path));
    Ok(())
}

/// Refuse to export an analysis of a file other than the one loaded.
fn ensure_analyzed(fingerprint: &str, loaded: Option<&Document>) -> Result<()> {
    match loaded {
        Some(document) if document.fingerprint() != fingerprint => anyhow::bail!(
            "L'analyse en mémoire ne correspond pas à {}, relancez l'analyse",
            document.name()
        ),
        _ => Ok(()),
    }
}

fn ask_path(prompt: &str) -> Result<PathBuf> {
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(bytes: &[u8]) -> Document {
        Document::from_bytes("bon.png", bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_export_allowed_for_analyzed_document() {
        let doc = document(b"first");
        assert!(ensure_analyzed(doc.fingerprint(), Some(&doc)).is_ok());
    }

    #[test]
    fn test_export_refused_after_loading_another_file() {
        let analyzed = document(b"first");
        let loaded = document(b"second");

        let err = ensure_analyzed(analyzed.fingerprint(), Some(&loaded)).unwrap_err();
        assert!(err.to_string().contains("bon.png"));
    }
}
