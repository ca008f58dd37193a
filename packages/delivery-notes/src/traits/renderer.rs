//! PDF rasterization trait.

use crate::error::Result;
use crate::types::document::PageImage;

/// Turns PDF bytes into one PNG per page, in page order.
pub trait PageRenderer {
    fn render(&self, pdf: &[u8]) -> Result<Vec<PageImage>>;
}
