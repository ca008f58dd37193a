//! Testing utilities including mock implementations.
//!
//! These make it possible to exercise the whole pipeline without a hosted
//! model or the pdfium library.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb};
use openai_client::OpenAIError;

use crate::error::Result;
use crate::pipeline::parse::parse_declared_total;
use crate::traits::model::VisionModel;
use crate::traits::renderer::PageRenderer;
use crate::types::document::PageImage;

/// Record of a call made to the mock model.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub prompt: String,
    /// Page numbers of the images sent
    pub pages: Vec<usize>,
    /// True for `declared_total` calls
    pub total_request: bool,
}

/// A scripted model.
///
/// Replies are consumed in order. Once the script runs dry every call fails
/// with an empty-response error.
#[derive(Default, Clone)]
pub struct MockModel {
    replies: Arc<Mutex<VecDeque<std::result::Result<String, OpenAIError>>>>,
    totals: Arc<Mutex<VecDeque<Option<f64>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a free-text reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    /// Queue a failed call.
    pub fn with_error(self, error: OpenAIError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queue an answer for the dedicated declared-total call.
    ///
    /// Without one, `declared_total` falls back to parsing a queued reply.
    pub fn with_total(self, total: Option<f64>) -> Self {
        self.totals.lock().unwrap().push_back(total);
        self
    }

    /// Get all calls made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, prompt: &str, images: &[PageImage], total_request: bool) {
        self.calls.lock().unwrap().push(MockCall {
            prompt: prompt.to_string(),
            pages: images.iter().map(|p| p.number).collect(),
            total_request,
        });
    }

    fn next_reply(&self) -> Result<String> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OpenAIError::EmptyResponse));
        Ok(reply?)
    }
}

#[async_trait]
impl VisionModel for MockModel {
    async fn complete(&self, prompt: &str, images: &[PageImage]) -> Result<String> {
        self.record(prompt, images, false);
        self.next_reply()
    }

    async fn declared_total(&self, prompt: &str, images: &[PageImage]) -> Result<Option<f64>> {
        self.record(prompt, images, true);
        let scripted = self.totals.lock().unwrap().pop_front();
        match scripted {
            Some(total) => Ok(total),
            None => parse_declared_total(&self.next_reply()?),
        }
    }
}

/// Renders any input as `pages` blank pages.
#[derive(Debug, Clone)]
pub struct MockRenderer {
    pages: usize,
}

impl MockRenderer {
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }
}

impl PageRenderer for MockRenderer {
    fn render(&self, _pdf: &[u8]) -> Result<Vec<PageImage>> {
        (1..=self.pages)
            .map(|number| Ok(PageImage::new(number, blank_png()?)))
            .collect()
    }
}

/// A 2x2 white PNG.
pub fn blank_png() -> Result<Vec<u8>> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([255, 255, 255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}
