//! Reception CLI
//!
//! Extracts the product table of a delivery note with a multimodal model,
//! checks it against the declared total and exports it.

mod context;
mod display;
mod interactive;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delivery_notes::export::{read_table_path, save_csv, save_xlsx};
use delivery_notes::pipeline::reconcile_table;
use delivery_notes::{Document, ExtractionError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::context::{AppContext, Overrides};

#[derive(Parser)]
#[command(name = "reception")]
#[command(about = "Extract and check supplier delivery notes")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the table of a PDF, image or spreadsheet
    Extract {
        file: PathBuf,

        /// Write the table to this XLSX file
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Chat model (overrides config and RECEPTION_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Attempts per page group, first one included
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Retry page groups whose lines disagree with their total
        #[arg(long)]
        require_consistent: bool,

        /// Ask for the declared total in a dedicated call
        #[arg(long)]
        separate_total: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile an exported (possibly corrected) XLSX or CSV table
    Reconcile { table: PathBuf },

    /// Menu-driven session
    Interactive { file: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,delivery_notes=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Extract {
            file,
            xlsx,
            csv,
            model,
            max_attempts,
            require_consistent,
            separate_total,
            json,
        } => {
            let overrides = Overrides {
                model,
                max_attempts,
                require_consistent,
                separate_total,
            };
            let ctx = AppContext::load(config_path, overrides)?;
            extract(&ctx, &file, xlsx.as_deref(), csv.as_deref(), json).await
        }
        Commands::Reconcile { table } => {
            let ctx = AppContext::load(config_path, Overrides::default())?;
            reconcile(&ctx, &table)
        }
        Commands::Interactive { file } => {
            let ctx = AppContext::load(config_path, Overrides::default())?;
            interactive::run(&ctx, file).await
        }
    }
}

async fn extract(
    ctx: &AppContext,
    file: &Path,
    xlsx: Option<&Path>,
    csv: Option<&Path>,
    json: bool,
) -> Result<()> {
    let document = Document::from_path(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let extractor = ctx.extractor()?;

    let report = match extractor.process(&document).await {
        Ok(report) => report,
        Err(ExtractionError::NothingExtracted { failures }) => {
            display::print_failures(&failures);
            anyhow::bail!("No rows extracted from {}", document.name());
        }
        Err(e) => return Err(e).context(format!("Failed to process {}", document.name())),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report, false);
        if !report.is_complete() {
            ctx.print_warning("Certaines pages n'ont pas pu être lues, vérifiez le tableau.");
        }
    }

    if let Some(path) = xlsx {
        save_xlsx(&report.table, path)?;
        ctx.print_success(&format!("✅ XLSX : {}", path.display()));
    }
    if let Some(path) = csv {
        save_csv(&report.table, path)?;
        ctx.print_success(&format!("✅ CSV : {}", path.display()));
    }
    Ok(())
}

fn reconcile(ctx: &AppContext, path: &Path) -> Result<()> {
    let table = read_table_path(path, &ctx.config.columns)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    ctx.print_header(&format!("📊 {}", path.display()));
    display::print_table(&table);
    println!();
    display::print_reconciliation(&reconcile_table(&table, None));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::try_parse_from([
            "reception",
            "--config",
            "reception.toml",
            "extract",
            "bon.pdf",
            "--xlsx",
            "out.xlsx",
            "--max-attempts",
            "3",
            "--require-consistent",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("reception.toml")));
        match cli.command {
            Commands::Extract {
                file,
                xlsx,
                csv,
                max_attempts,
                require_consistent,
                separate_total,
                ..
            } => {
                assert_eq!(file, PathBuf::from("bon.pdf"));
                assert_eq!(xlsx, Some(PathBuf::from("out.xlsx")));
                assert_eq!(csv, None);
                assert_eq!(max_attempts, Some(3));
                assert!(require_consistent);
                assert!(!separate_total);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_interactive_file_is_optional() {
        let cli = Cli::try_parse_from(["reception", "interactive"]).unwrap();
        assert!(matches!(cli.command, Commands::Interactive { file: None }));
    }
}
