//! Anthropic Messages API adapter.
//!
//! Sends every photo of a book as a base64 `image` content block followed by
//! one `text` block with the extraction instruction, all in a single user
//! turn, so the model can combine what it sees on the front cover with the
//! ISBN on the back. One HTTP request per call; no retry.

use crate::capability::AiModel;
use crate::config::ExtractionConfig;
use crate::error::BookMetaError;
use crate::pipeline::encode::{encode_all, EncodedImage};
use async_trait::async_trait;
use image::DynamicImage;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

const PROVIDER: &str = "anthropic";

/// [`AiModel`] backed by the Anthropic Messages API.
pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: usize,
    temperature: f32,
    instruction: String,
    timeout_secs: u64,
}

impl AnthropicModel {
    /// Build an adapter from the config. Requires `anthropic_api_key`.
    pub fn new(config: &ExtractionConfig) -> Result<Self, BookMetaError> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .ok_or_else(|| BookMetaError::ProviderNotConfigured {
                provider: PROVIDER.to_string(),
                hint: "Set ANTHROPIC_API_KEY (or ANTHROPIC_KEY).".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| BookMetaError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.anthropic_model.clone(),
            endpoint: format!("{}/v1/messages", config.anthropic_base_url.trim_end_matches('/')),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            instruction: config.instruction().to_string(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, images: &'a [EncodedImage]) -> MessagesRequest<'a> {
        build_request(&self.model, self.max_tokens, self.temperature, &self.instruction, images)
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<String, BookMetaError> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BookMetaError::ApiTimeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    }
                } else {
                    BookMetaError::LlmApiError {
                        message: format!("request to {} failed: {e}", self.endpoint),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, retry_after));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BookMetaError::ApiTimeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                }
            } else {
                BookMetaError::LlmApiError {
                    message: format!("malformed response: {e}"),
                }
            }
        })?;

        debug!(
            "{} input tokens, {} output tokens, {:?} (timeout {}s)",
            parsed.usage.input_tokens,
            parsed.usage.output_tokens,
            start.elapsed(),
            self.timeout_secs
        );

        Ok(parsed.text())
    }
}

#[async_trait]
impl AiModel for AnthropicModel {
    async fn complete(&self, images: &[DynamicImage]) -> Result<String, BookMetaError> {
        if images.is_empty() {
            return Err(BookMetaError::EmptyImageSet);
        }
        let encoded = encode_all(images)?;
        let body = self.build_request(&encoded);

        let span = info_span!("ai_model_call", model = %self.model, images = images.len());
        let reply = self.send(&body).instrument(span).await?;
        debug!("Model reply: {} chars", reply.len());
        Ok(reply)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl MessagesResponse {
    /// Concatenated text of every `text` content block.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// One user turn: all images in order, then the instruction.
pub(crate) fn build_request<'a>(
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    instruction: &'a str,
    images: &'a [EncodedImage],
) -> MessagesRequest<'a> {
    let mut content: Vec<ContentBlock<'a>> = images
        .iter()
        .map(|img| ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: img.media_type,
                data: &img.data,
            },
        })
        .collect();
    content.push(ContentBlock::Text { text: instruction });

    MessagesRequest {
        model,
        max_tokens,
        temperature,
        messages: vec![Message {
            role: "user",
            content,
        }],
    }
}

/// Map a non-2xx status to the crate error.
pub(crate) fn status_error(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> BookMetaError {
    let detail = api_error_message(body).unwrap_or_else(|| body.trim().to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BookMetaError::AuthError {
            provider: PROVIDER.to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => BookMetaError::RateLimitExceeded {
            provider: PROVIDER.to_string(),
            retry_after_secs,
        },
        _ => BookMetaError::LlmApiError {
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

/// Pull `error.message` out of an Anthropic error body.
fn api_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}
