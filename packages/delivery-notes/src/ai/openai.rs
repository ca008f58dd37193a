//! OpenAI implementation of the vision model trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use delivery_notes::ai::OpenAIVision;
//!
//! let model = OpenAIVision::from_credentials(&ApiCredentials::from_env()?, &config);
//! let reply = model.complete(&prompt, &pages).await?;
//! ```

use async_trait::async_trait;
use openai_client::{ChatRequest, ContentPart, Message, OpenAIClient};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::security::ApiCredentials;
use crate::traits::model::VisionModel;
use crate::types::config::ExtractorConfig;
use crate::types::document::PageImage;

/// Structured reply of the declared-total call.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeclaredTotal {
    /// Total quantity written on the document, null when absent
    pub total: Option<f64>,
}

/// GPT-4o style multimodal chat model.
#[derive(Clone)]
pub struct OpenAIVision {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIVision {
    pub fn new(client: OpenAIClient) -> Self {
        let defaults = ExtractorConfig::default();
        Self {
            client,
            model: defaults.model,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Build a client from credentials and take model settings from `config`.
    pub fn from_credentials(credentials: &ApiCredentials, config: &ExtractorConfig) -> Self {
        let mut client = OpenAIClient::new(credentials.api_key.expose());
        if let Some(url) = &credentials.base_url {
            client = client.with_base_url(url);
        }
        Self::new(client)
            .with_model(&config.model)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One user message: the instruction, then every page image.
    pub fn build_request(&self, prompt: &str, images: &[PageImage]) -> ChatRequest {
        let message = if images.is_empty() {
            Message::user(prompt)
        } else {
            let mut parts = Vec::with_capacity(images.len() + 1);
            parts.push(ContentPart::text(prompt));
            parts.extend(images.iter().map(|page| ContentPart::png(&page.png)));
            Message::user_parts(parts)
        };

        ChatRequest::new(&self.model)
            .message(message)
            .temperature(self.temperature)
            .token_limit(self.max_tokens)
    }
}

#[async_trait]
impl VisionModel for OpenAIVision {
    async fn complete(&self, prompt: &str, images: &[PageImage]) -> Result<String> {
        let request = self.build_request(prompt, images);
        let response = self.client.chat_completion(request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                images = images.len(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model call finished"
            );
        }

        Ok(response.content)
    }

    async fn declared_total(&self, prompt: &str, images: &[PageImage]) -> Result<Option<f64>> {
        let request = self.build_request(prompt, images);
        let reply: DeclaredTotal = self.client.extract(request).await?;
        Ok(reply.total)
    }
}
