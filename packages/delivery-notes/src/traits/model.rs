//! Multimodal model trait.
//!
//! Abstracts the one capability the pipeline needs from a hosted model:
//! answer a text instruction about zero or more page images with free text.

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::parse::parse_declared_total;
use crate::types::document::PageImage;

/// A model that reads page images and answers in free text.
///
/// Implementations wrap a specific provider and handle its request format.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `prompt` with the given page images and return the reply text.
    ///
    /// An empty `images` slice means a text-only call.
    async fn complete(&self, prompt: &str, images: &[PageImage]) -> Result<String>;

    /// Ask for the total the document itself declares.
    ///
    /// The default implementation makes a free-text call and pulls a
    /// `{"total": ...}` object out of the reply.
    async fn declared_total(&self, prompt: &str, images: &[PageImage]) -> Result<Option<f64>> {
        let reply = self.complete(prompt, images).await?;
        parse_declared_total(&reply)
    }
}
