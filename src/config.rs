//! Configuration for model adapters and registry set-up.
//!
//! All behaviour that is decided at start-up is controlled through
//! [`ExtractionConfig`], built via its [`ExtractionConfigBuilder`] or read once
//! from the process environment with [`ExtractionConfig::from_env`]. The
//! pipeline never reads environment variables mid-run.

use crate::error::BookMetaError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Registry name of the built-in Anthropic adapter.
pub const ANTHROPIC_MODEL_NAME: &str = "anthropic";

/// Default Claude model used by the Anthropic adapter.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Default Anthropic API endpoint (without the `/v1/messages` path).
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default model for a named edgequake-llm provider.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

/// Configuration for extracting book metadata.
///
/// # Example
/// ```rust
/// use edgequake_bookmeta::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .anthropic_api_key("sk-ant-...")
///     .max_tokens(1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1024);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Anthropic API key. When `None` the `anthropic` model is not registered.
    pub anthropic_api_key: Option<String>,

    /// Claude model identifier. Default: `claude-3-5-sonnet-20240620`.
    pub anthropic_model: String,

    /// Anthropic endpoint base URL. Default: `https://api.anthropic.com`.
    pub anthropic_base_url: String,

    /// edgequake-llm provider name (e.g. "openai", "gemini", "ollama").
    /// The provider is registered under this name.
    pub provider_name: Option<String>,

    /// Model for the named provider. If None, uses `gpt-4.1-nano`.
    pub provider_model: Option<String>,

    /// Pre-constructed provider. Takes precedence over creating one from
    /// `provider_name`; registered under `provider_name` or "custom".
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per book. Default: 2048.
    pub max_tokens: usize,

    /// Custom instruction sent after the images. If None, uses
    /// [`crate::prompts::BOOK_METADATA_PROMPT`].
    pub instruction: Option<String>,

    /// Transport deadline for one model call in seconds. Default: 120.
    pub api_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            provider_name: None,
            provider_model: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 2048,
            instruction: None,
            api_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("anthropic_model", &self.anthropic_model)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("provider_name", &self.provider_name)
            .field("provider_model", &self.provider_model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("instruction", &self.instruction.as_ref().map(String::len))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Populate a config from the process environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `ANTHROPIC_API_KEY` (fallback `ANTHROPIC_KEY`) | `anthropic_api_key` |
    /// | `ANTHROPIC_MODEL` | `anthropic_model` |
    /// | `ANTHROPIC_BASE_URL` | `anthropic_base_url` |
    /// | `EDGEQUAKE_LLM_PROVIDER` | `provider_name` |
    /// | `EDGEQUAKE_MODEL` | `provider_model` |
    ///
    /// Empty values are treated as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.anthropic_api_key = get("ANTHROPIC_API_KEY").or_else(|| get("ANTHROPIC_KEY"));
        if let Some(model) = get("ANTHROPIC_MODEL") {
            config.anthropic_model = model;
        }
        if let Some(url) = get("ANTHROPIC_BASE_URL") {
            config.anthropic_base_url = url;
        }
        config.provider_name = get("EDGEQUAKE_LLM_PROVIDER");
        config.provider_model = get("EDGEQUAKE_MODEL");
        config
    }

    /// Instruction actually sent to the model.
    pub fn instruction(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::BOOK_METADATA_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Start from an existing config (e.g. one read with `from_env`).
    pub fn from_config(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.anthropic_api_key = Some(key.into());
        self
    }

    pub fn anthropic_model(mut self, model: impl Into<String>) -> Self {
        self.config.anthropic_model = model.into();
        self
    }

    pub fn anthropic_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.anthropic_base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider_model(mut self, model: impl Into<String>) -> Self {
        self.config.provider_model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, BookMetaError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(BookMetaError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(BookMetaError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !c.anthropic_base_url.starts_with("http://") && !c.anthropic_base_url.starts_with("https://") {
            return Err(BookMetaError::InvalidConfig(format!(
                "anthropic_base_url must be an HTTP(S) URL, got '{}'",
                c.anthropic_base_url
            )));
        }
        if let Some(ref instruction) = c.instruction {
            if instruction.trim().is_empty() {
                return Err(BookMetaError::InvalidConfig(
                    "instruction must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.anthropic_model, DEFAULT_ANTHROPIC_MODEL);
        assert!(c.anthropic_api_key.is_none());
        assert_eq!(c.instruction(), crate::prompts::BOOK_METADATA_PROMPT);
    }

    #[test]
    fn from_lookup_prefers_new_key_name() {
        let env: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "new"),
            ("ANTHROPIC_KEY", "legacy"),
            ("EDGEQUAKE_LLM_PROVIDER", "openai"),
        ]
        .into_iter()
        .collect();
        let c = ExtractionConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.anthropic_api_key.as_deref(), Some("new"));
        assert_eq!(c.provider_name.as_deref(), Some("openai"));
        assert!(c.provider_model.is_none());
    }

    #[test]
    fn from_lookup_falls_back_to_legacy_key_and_ignores_blank() {
        let env: HashMap<&str, &str> = [("ANTHROPIC_API_KEY", "  "), ("ANTHROPIC_KEY", "legacy")]
            .into_iter()
            .collect();
        let c = ExtractionConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.anthropic_api_key.as_deref(), Some("legacy"));
    }

    #[test]
    fn missing_credentials_leave_key_unset() {
        let c = ExtractionConfig::from_lookup(|_| None);
        assert!(c.anthropic_api_key.is_none());
        assert!(c.provider_name.is_none());
    }

    #[test]
    fn build_rejects_zero_tokens() {
        let err = ExtractionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, BookMetaError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_non_http_base_url() {
        let err = ExtractionConfig::builder()
            .anthropic_base_url("api.anthropic.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP(S)"));
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractionConfig::builder().temperature(3.0).build().unwrap();
        assert_eq!(c.temperature, 1.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ExtractionConfig::builder()
            .anthropic_api_key("sk-ant-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-ant-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
