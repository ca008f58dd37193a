//! Terminal rendering of tables and reconciliation results

use colored::Colorize;
use console::{measure_text_width, pad_str, Alignment};
use delivery_notes::pipeline::ReconcileStatus;
use delivery_notes::types::table::format_number;
use delivery_notes::{DeliveryTable, ExtractionReport, PageFailure, Reconciliation};

/// Plain-text table with aligned columns; numbers are right-aligned.
pub fn render_table(table: &DeliveryTable) -> String {
    let headers = table.labels.headers();
    let number = |v: Option<f64>| v.map(format_number).unwrap_or_default();

    let rows: Vec<[String; 4]> = table
        .lines()
        .iter()
        .map(|l| {
            [
                l.reference.clone(),
                number(l.cartons),
                number(l.quantity),
                l.check.clone(),
            ]
        })
        .collect();

    let widths: Vec<usize> = (0..4)
        .map(|col| {
            rows.iter()
                .map(|row| measure_text_width(&row[col]))
                .chain(std::iter::once(measure_text_width(headers[col])))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let align = |col: usize| match col {
        1 | 2 => Alignment::Right,
        _ => Alignment::Left,
    };
    let line = |cells: [&str; 4]| {
        cells
            .iter()
            .enumerate()
            .map(|(col, cell)| pad_str(cell, widths[col], align(col), None).into_owned())
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        out.push(line([&row[0], &row[1], &row[2], &row[3]]));
    }
    out.join("\n")
}

pub fn print_table(table: &DeliveryTable) {
    let rendered = render_table(table);
    let mut lines = rendered.lines();
    if let Some(header) = lines.next() {
        println!("{}", header.bold());
    }
    for (text, line) in lines.zip(std::iter::once(None).chain(table.lines().iter().map(Some))) {
        match line {
            Some(l) if l.is_total() => println!("{}", text.bold()),
            _ => println!("{}", text),
        }
    }
}

pub fn print_reconciliation(reconciliation: &Reconciliation) {
    let message = reconciliation.message();
    match reconciliation.status {
        ReconcileStatus::Consistent => println!("{}", format!("✅ {}", message).bright_green()),
        ReconcileStatus::Mismatch { difference } => {
            println!("{}", format!("❌ {}", message).bright_red().bold());
            println!("   Écart : {}", format_number(difference));
        }
        ReconcileStatus::NoDeclaredTotal => println!("{}", format!("⚠️  {}", message).yellow()),
    }
}

pub fn print_failures(failures: &[PageFailure]) {
    for failure in failures {
        println!(
            "{} {} ({} tentative(s)) : {}",
            "⚠️ ".yellow(),
            failure.label().yellow(),
            failure.attempts,
            failure.message
        );
    }
}

pub fn print_report(report: &ExtractionReport, cached: bool) {
    println!();
    println!("{} {}", "📄".cyan(), report.document_name.bold());
    println!("   Empreinte : {}", report.fingerprint.dimmed());
    if cached {
        println!("   {}", "(résultat en cache)".dimmed());
    }
    println!();

    print_table(&report.table);
    println!();
    print_failures(&report.failures);
    for warning in &report.warnings {
        println!("{} {}", "⚠️ ".yellow(), warning);
    }
    print_reconciliation(&report.reconciliation);
}
