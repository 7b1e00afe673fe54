//! VLM interaction through any edgequake-llm provider.
//!
//! [`ProviderModel`] lets OpenAI, Gemini, Azure, Ollama and every other
//! provider supported by `edgequake-llm` act as an [`AiModel`]. The request
//! is one user message carrying the instruction and every photo of the book.

use crate::capability::AiModel;
use crate::config::{ExtractionConfig, DEFAULT_PROVIDER_MODEL};
use crate::error::BookMetaError;
use crate::pipeline::encode::encode_all;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

/// [`AiModel`] backed by an `edgequake_llm::LLMProvider`.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    instruction: String,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderModel {
    /// Wrap an already constructed provider. `label` is used in logs and
    /// error messages only.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            instruction: config.instruction().to_string(),
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Create the provider named `provider_name` via [`ProviderFactory`].
    ///
    /// The factory reads the provider's API key (`OPENAI_API_KEY`, …) itself.
    pub fn from_factory(provider_name: &str, config: &ExtractionConfig) -> Result<Self, BookMetaError> {
        let model = config
            .provider_model
            .as_deref()
            .unwrap_or(DEFAULT_PROVIDER_MODEL);
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            BookMetaError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}/{model}"), config))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl AiModel for ProviderModel {
    async fn complete(&self, images: &[DynamicImage]) -> Result<String, BookMetaError> {
        if images.is_empty() {
            return Err(BookMetaError::EmptyImageSet);
        }
        let attachments: Vec<_> = encode_all(images)?
            .into_iter()
            .map(|img| img.into_image_data())
            .collect();
        let messages = vec![ChatMessage::user_with_images(
            self.instruction.as_str(),
            attachments,
        )];

        let span = info_span!("ai_model_call", model = %self.label, images = images.len());
        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&self.options)))
            .instrument(span)
            .await
            .map_err(|_| BookMetaError::ApiTimeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })?
            .map_err(|e| BookMetaError::LlmApiError {
                message: format!("{}: {}", self.label, e),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
