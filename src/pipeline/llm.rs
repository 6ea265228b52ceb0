//! Model capabilities: the two kinds of call the orchestrator makes.
//!
//! [`TextGeneration`] takes a prompt; [`VisionGeneration`] takes a prompt
//! plus the résumé image. The orchestrator depends only on these traits, so
//! tests drive it with stubs and production wires in [`LlmCapability`], an
//! adapter over any `edgequake_llm` provider.
//!
//! Each call is a single attempt. There is no retry, backoff or timeout here;
//! whatever the provider's HTTP client does is what you get.

use crate::config::MatchConfig;
use crate::error::CapabilityError;
use crate::output::DocumentImagePart;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Prompt in, generated text out.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Prompt plus one image in, generated text out.
#[async_trait]
pub trait VisionGeneration: Send + Sync {
    async fn generate_with_image(
        &self,
        prompt: &str,
        image: &DocumentImagePart,
    ) -> Result<String, CapabilityError>;
}

/// A capability backed by an `edgequake_llm` provider.
///
/// One instance serves either role; the session builds one for the text
/// model and one for the vision model.
pub struct LlmCapability {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCapability {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &MatchConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, CapabilityError> {
        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| CapabilityError::new(e.to_string()))?;
        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        if response.content.trim().is_empty() {
            return Err(CapabilityError::new("model returned an empty reply"));
        }
        Ok(response.content)
    }
}

#[async_trait]
impl TextGeneration for LlmCapability {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }
}

#[async_trait]
impl VisionGeneration for LlmCapability {
    async fn generate_with_image(
        &self,
        prompt: &str,
        image: &DocumentImagePart,
    ) -> Result<String, CapabilityError> {
        self.chat(vec![ChatMessage::user_with_images(
            prompt,
            vec![to_image_data(image)],
        )])
        .await
    }
}

/// Convert the pipeline's image part into the provider request type.
pub fn to_image_data(image: &DocumentImagePart) -> ImageData {
    ImageData::new(image.data().to_string(), image.mime_type())
}

/// Build `CompletionOptions` from the match config.
fn build_options(config: &MatchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = MatchConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn image_data_carries_jpeg_mime() {
        let part = DocumentImagePart::from_jpeg(&[0xFF, 0xD8, 0xFF]);
        let data = to_image_data(&part);
        assert_eq!(data.mime_type, "image/jpeg");
        assert_eq!(data.data, part.data());
    }
}
