//! Turn an uploaded document into model input.
//!
//! PDFs are rasterized page by page, images are normalized to PNG, and
//! spreadsheets are flattened to tab-separated text.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use image::ImageFormat;
use tracing::{debug, info};

use crate::error::{ExtractionError, Result};
use crate::traits::renderer::PageRenderer;
use crate::types::document::{Document, DocumentKind, ModelInput, PageImage};
use crate::types::table::Cell;

/// Prepare what the model will see for `document`.
pub fn prepare_input<R: PageRenderer + ?Sized>(
    document: &Document,
    renderer: &R,
) -> Result<ModelInput> {
    let input = match document.kind() {
        DocumentKind::Pdf => {
            let pages = renderer.render(document.bytes())?;
            if pages.is_empty() {
                return Err(ExtractionError::Render(format!(
                    "{} has no pages",
                    document.name()
                )));
            }
            ModelInput::Pages(pages)
        }
        DocumentKind::Png | DocumentKind::Jpeg => {
            ModelInput::Pages(vec![PageImage::new(1, normalize_image(document.bytes())?)])
        }
        DocumentKind::Spreadsheet => ModelInput::Text(spreadsheet_text(document.bytes())?),
    };

    match &input {
        ModelInput::Pages(pages) => info!(
            document = %document.name(),
            pages = pages.len(),
            "Prepared page images"
        ),
        ModelInput::Text(text) => info!(
            document = %document.name(),
            chars = text.chars().count(),
            "Prepared spreadsheet text"
        ),
    }

    Ok(input)
}

/// Decode any supported image and re-encode it as PNG.
pub fn normalize_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(bytes)?;
    debug!(width = image.width(), height = image.height(), "Decoded image");

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Read the first worksheet of an XLS/XLSX workbook as rows of cells.
pub fn read_sheet_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ExtractionError::Spreadsheet("workbook has no worksheet".into()))?
        .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(to_cell).collect())
        .collect())
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Flatten the first worksheet to tab-separated lines, skipping empty rows.
pub fn spreadsheet_text(bytes: &[u8]) -> Result<String> {
    let rows = read_sheet_rows(bytes)?;

    let lines: Vec<String> = rows
        .iter()
        .filter(|row| row.iter().any(|c| *c != Cell::Empty))
        .map(|row| row.iter().map(Cell::as_text).collect::<Vec<_>>().join("\t"))
        .collect();

    if lines.is_empty() {
        return Err(ExtractionError::Spreadsheet("worksheet is empty".into()));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderer;
    use image::{ImageBuffer, Rgb};
    use rust_xlsxwriter::Workbook;

    fn jpeg_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(8, 4, Rgb([200, 10, 10]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
            .unwrap();
        out
    }

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Ref").unwrap();
        sheet.write_string(0, 1, "Qty").unwrap();
        sheet.write_string(1, 0, "A-100").unwrap();
        sheet.write_number(1, 1, 108).unwrap();
        sheet.write_string(3, 0, "B-200").unwrap();
        sheet.write_number(3, 1, 50.5).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_normalize_jpeg_to_png() {
        let png = normalize_image(&jpeg_bytes()).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_corrupt_image_is_error() {
        let err = normalize_image(&[0xFF, 0xD8, 0xFF, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractionError::Image(_)));
    }

    #[test]
    fn test_spreadsheet_text_is_tab_separated() {
        let text = spreadsheet_text(&workbook_bytes()).unwrap();
        assert_eq!(text, "Ref\tQty\nA-100\t108\nB-200\t50.5");
    }

    #[test]
    fn test_garbage_spreadsheet_is_error() {
        let err = spreadsheet_text(b"PK\x03\x04 not a zip").unwrap_err();
        assert!(matches!(err, ExtractionError::Spreadsheet(_)));
    }

    #[test]
    fn test_prepare_image_document() {
        let doc = Document::from_bytes("photo.jpg", jpeg_bytes()).unwrap();
        let input = prepare_input(&doc, &MockRenderer::new(0)).unwrap();

        match input {
            ModelInput::Pages(pages) => {
                assert_eq!(pages.len(), 1);
                assert_eq!(pages[0].number, 1);
            }
            ModelInput::Text(_) => panic!("expected pages"),
        }
    }

    #[test]
    fn test_prepare_pdf_document_uses_renderer() {
        let doc = Document::from_bytes("bon.pdf", b"%PDF-1.7".to_vec()).unwrap();
        let input = prepare_input(&doc, &MockRenderer::new(3)).unwrap();

        match input {
            ModelInput::Pages(pages) => {
                let numbers: Vec<usize> = pages.iter().map(|p| p.number).collect();
                assert_eq!(numbers, vec![1, 2, 3]);
            }
            ModelInput::Text(_) => panic!("expected pages"),
        }
    }

    #[test]
    fn test_prepare_empty_pdf_is_error() {
        let doc = Document::from_bytes("bon.pdf", b"%PDF-1.7".to_vec()).unwrap();
        let err = prepare_input(&doc, &MockRenderer::new(0)).unwrap_err();
        assert!(matches!(err, ExtractionError::Render(_)));
    }

    #[test]
    fn test_prepare_spreadsheet_document() {
        let doc = Document::from_bytes("bon.xlsx", workbook_bytes()).unwrap();
        let input = prepare_input(&doc, &MockRenderer::new(0)).unwrap();
        assert!(matches!(input, ModelInput::Text(text) if text.starts_with("Ref\tQty")));
    }
}
