//! Spreadsheet export and re-import of delivery tables.
//!
//! XLSX files carry one `BON_LIVRAISON` sheet with a bold header row; CSV
//! files use the same columns. Both can be read back into a table, which is
//! how a corrected export gets reconciled again.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::error::{ExtractionError, Result};
use crate::pipeline::ingest::read_sheet_rows;
use crate::types::document::DocumentKind;
use crate::types::table::{
    format_number, label_matches, Cell, ColumnLabels, DeliveryLine, DeliveryTable,
};

pub const SHEET_NAME: &str = "BON_LIVRAISON";
pub const DEFAULT_XLSX_NAME: &str = "bon_de_livraison_corrige.xlsx";
pub const DEFAULT_CSV_NAME: &str = "bon_de_livraison_corrige.csv";

const COLUMN_WIDTH: f64 = 30.0;

/// Encode `table` as an XLSX workbook.
pub fn write_xlsx(table: &DeliveryTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, header) in table.labels.headers().iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &bold)?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    for (index, line) in table.lines().iter().enumerate() {
        let row = index as u32 + 1;
        if !line.reference.is_empty() {
            sheet.write_string(row, 0, &line.reference)?;
        }
        if let Some(cartons) = line.cartons {
            sheet.write_number(row, 1, cartons)?;
        }
        if let Some(quantity) = line.quantity {
            sheet.write_number(row, 2, quantity)?;
        }
        if !line.check.is_empty() {
            sheet.write_string(row, 3, &line.check)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn save_xlsx(table: &DeliveryTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, write_xlsx(table)?)?;
    info!(path = %path.display(), lines = table.len(), "Wrote XLSX export");
    Ok(())
}

/// Encode `table` as UTF-8 CSV with a header row.
pub fn write_csv(table: &DeliveryTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.labels.headers())?;

    let number = |value: Option<f64>| value.map(format_number).unwrap_or_default();
    for line in table.lines() {
        let (cartons, quantity) = (number(line.cartons), number(line.quantity));
        writer.write_record([
            line.reference.as_str(),
            cartons.as_str(),
            quantity.as_str(),
            line.check.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExtractionError::Io(e.into_error()))
}

pub fn save_csv(table: &DeliveryTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, write_csv(table)?)?;
    info!(path = %path.display(), lines = table.len(), "Wrote CSV export");
    Ok(())
}

/// Read an exported (possibly hand-corrected) XLSX or CSV file.
///
/// The first non-empty row is the header. Columns are found by label, so
/// their order and the language of the label do not matter.
pub fn read_table(bytes: &[u8], name: &str, labels: &ColumnLabels) -> Result<DeliveryTable> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let is_sheet = |kind: Option<DocumentKind>| kind == Some(DocumentKind::Spreadsheet);

    let rows = if extension.as_deref() == Some("csv") {
        read_csv_rows(bytes)?
    } else if is_sheet(extension.as_deref().and_then(DocumentKind::from_extension))
        || is_sheet(DocumentKind::sniff(bytes))
    {
        read_sheet_rows(bytes)?
    } else {
        return Err(ExtractionError::UnsupportedFormat {
            name: name.to_string(),
        });
    };

    table_from_cells(rows, labels)
}

pub fn read_table_path(path: impl AsRef<Path>, labels: &ColumnLabels) -> Result<DeliveryTable> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    read_table(&bytes, &name, labels)
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| match field.trim() {
                    "" => Cell::Empty,
                    text => Cell::Text(text.to_string()),
                })
                .collect(),
        );
    }
    Ok(rows)
}

fn table_from_cells(rows: Vec<Vec<Cell>>, labels: &ColumnLabels) -> Result<DeliveryTable> {
    let mut rows = rows
        .into_iter()
        .filter(|row| row.iter().any(|c| *c != Cell::Empty));

    let header: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(Cell::as_text).collect())
        .unwrap_or_default();
    let column = |label: &str| header.iter().position(|h| label_matches(h, label));

    let (reference, quantity) = (column(&labels.reference), column(&labels.quantity));
    let missing: Vec<String> = [(&labels.reference, reference), (&labels.quantity, quantity)]
        .into_iter()
        .filter(|(_, found)| found.is_none())
        .map(|(label, _)| label.clone())
        .collect();
    let (Some(reference), Some(quantity)) = (reference, quantity) else {
        return Err(ExtractionError::MissingColumns { missing });
    };
    let (cartons, check) = (column(&labels.cartons), column(&labels.check));

    let cell = |row: &[Cell], index: Option<usize>| index.and_then(|i| row.get(i)).cloned();
    let lines = rows.map(|row| {
        DeliveryLine::new(
            cell(&row[..], Some(reference)).map(|c| c.as_text()).unwrap_or_default(),
            cell(&row[..], Some(quantity)).and_then(|c| c.as_number()),
        )
        .with_cartons(cell(&row[..], cartons).and_then(|c| c.as_number()))
        .with_check(cell(&row[..], check).map(|c| c.as_text()).unwrap_or_default())
    });

    Ok(DeliveryTable::new(labels.clone()).with_lines(lines))
}
