//! PDF rasterization with pdfium.
//!
//! Binds the pdfium shared library from the working directory first and
//! falls back to the system library.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::traits::renderer::PageRenderer;
use crate::types::document::PageImage;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders every PDF page to PNG at a fixed resolution.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    dpi: f32,
}

impl PdfiumRenderer {
    /// Bind pdfium and render at `dpi`.
    pub fn new(dpi: f32) -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractionError::Render(format!("failed to bind pdfium: {}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi,
        })
    }

    fn render_page(&self, page: &PdfPage, number: usize) -> Result<PageImage> {
        let scale = self.dpi / POINTS_PER_INCH;
        let width = (page.width().value * scale).round() as i32;
        let height = (page.height().value * scale).round() as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width)
                    .set_target_height(height)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| ExtractionError::Render(format!("page {}: {}", number, e)))?;

        let (w, h) = (bitmap.width() as u32, bitmap.height() as u32);
        let rgba = RgbaImage::from_raw(w, h, bitmap.as_rgba_bytes()).ok_or_else(|| {
            ExtractionError::Render(format!("page {}: bitmap size does not match {}x{}", number, w, h))
        })?;

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(rgba).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        debug!(page = number, width = w, height = h, bytes = png.len(), "Rendered PDF page");
        Ok(PageImage::new(number, png))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, pdf: &[u8]) -> Result<Vec<PageImage>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ExtractionError::Render(format!("failed to load PDF: {}", e)))?;

        document
            .pages()
            .iter()
            .enumerate()
            .map(|(index, page)| self.render_page(&page, index + 1))
            .collect()
    }
}
