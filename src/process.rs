//! Single-book entry points and default registry set-up.

use crate::capability::{AiModel, OutputGenerator};
use crate::config::{ExtractionConfig, ANTHROPIC_MODEL_NAME};
use crate::error::BookMetaError;
use crate::output::Formatted;
use crate::pipeline::anthropic::AnthropicModel;
use crate::pipeline::generate::{
    Bibframe2Generator, CsvGenerator, Marc21Generator, TableGenerator, BIBFRAME2_FORMAT, CSV_FORMAT,
    MARC21_FORMAT, TABLE_FORMAT,
};
use crate::pipeline::llm::ProviderModel;
use crate::registry::{CapabilityKind, Registry};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Registry name used for an injected provider that has no name.
const CUSTOM_PROVIDER_NAME: &str = "custom";

/// Build a registry holding every capability `config` makes available.
///
/// - `anthropic` when an Anthropic API key is set.
/// - The configured edgequake-llm provider under its provider name. A
///   provider that cannot be created is logged and left out.
/// - The `CSV`, `TABLE`, `MARC21` and `BIBFRAME2` output generators.
///
/// No text extractor is registered.
pub fn configure_registry(config: &ExtractionConfig) -> Result<Registry, BookMetaError> {
    let mut registry = Registry::new();

    if config.anthropic_api_key.is_some() {
        let model = AnthropicModel::new(config)?;
        info!("AI model '{}' → {}", ANTHROPIC_MODEL_NAME, model.model());
        registry.register_ai_model(ANTHROPIC_MODEL_NAME, Arc::new(model));
    } else {
        debug!("No Anthropic API key; '{}' not registered", ANTHROPIC_MODEL_NAME);
    }

    if let Some(ref provider) = config.provider {
        let name = config.provider_name.as_deref().unwrap_or(CUSTOM_PROVIDER_NAME);
        let model = ProviderModel::new(Arc::clone(provider), name, config);
        registry.register_ai_model(name, Arc::new(model));
    } else if let Some(ref name) = config.provider_name {
        match ProviderModel::from_factory(name, config) {
            Ok(model) => {
                info!("AI model '{}' → {}", name, model.label());
                registry.register_ai_model(name.as_str(), Arc::new(model));
            }
            Err(e) => warn!("AI model '{}' not registered: {}", name, e),
        }
    }

    registry.register_output_generator(CSV_FORMAT, Arc::new(CsvGenerator));
    registry.register_output_generator(TABLE_FORMAT, Arc::new(TableGenerator));
    registry.register_output_generator(MARC21_FORMAT, Arc::new(Marc21Generator));
    registry.register_output_generator(BIBFRAME2_FORMAT, Arc::new(Bibframe2Generator));

    Ok(registry)
}

/// Look up both capabilities of a run and make sure the generator can
/// render output. The model is not invoked.
pub(crate) fn resolve_pair(
    registry: &Registry,
    model_name: &str,
    format_name: &str,
) -> Result<(Arc<dyn AiModel>, Arc<dyn OutputGenerator>), BookMetaError> {
    let model = registry
        .ai_model(model_name)
        .ok_or_else(|| BookMetaError::CapabilityNotFound {
            kind: CapabilityKind::AiModel,
            name: model_name.to_string(),
        })?;
    let generator = registry
        .output_generator(format_name)
        .ok_or_else(|| BookMetaError::CapabilityNotFound {
            kind: CapabilityKind::OutputGenerator,
            name: format_name.to_string(),
        })?;
    generator.ensure_supported()?;
    Ok((model, generator))
}

/// Extract the metadata of one book and render it.
///
/// Both names are resolved before the model is called, so a typo in
/// `format_name` or a reserved format never costs a remote request.
///
/// # Errors
/// - [`BookMetaError::CapabilityNotFound`] for an unregistered name
/// - [`BookMetaError::FormatNotImplemented`] for a reserved format
/// - [`BookMetaError::EmptyImageSet`] when `images` is empty
/// - whatever the model or generator reports
pub async fn process(
    registry: &Registry,
    images: &[DynamicImage],
    model_name: &str,
    format_name: &str,
) -> Result<Formatted, BookMetaError> {
    let (model, generator) = resolve_pair(registry, model_name, format_name)?;
    let (output, _rows) = extract(model.as_ref(), generator.as_ref(), images).await?;
    Ok(output)
}

/// Run one model call and render its rows. Returns the output together with
/// the number of row records the model produced.
pub(crate) async fn extract(
    model: &dyn AiModel,
    generator: &dyn OutputGenerator,
    images: &[DynamicImage],
) -> Result<(Formatted, usize), BookMetaError> {
    if images.is_empty() {
        return Err(BookMetaError::EmptyImageSet);
    }

    let start = Instant::now();
    let rows = model.process(images).await?;
    let count = rows.len();
    debug!("Model returned {} rows in {:?}", count, start.elapsed());
    Ok((generator.generate(rows)?, count))
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn process_sync(
    registry: &Registry,
    images: &[DynamicImage],
    model_name: &str,
    format_name: &str,
) -> Result<Formatted, BookMetaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BookMetaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(registry, images, model_name, format_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REPLY: &str = "| Title | Author |\n|---|---|\n| Emma | Jane Austen |";

    #[derive(Default)]
    struct StubModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AiModel for StubModel {
        async fn complete(&self, _images: &[DynamicImage]) -> Result<String, BookMetaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(REPLY.to_string())
        }
    }

    fn registry_with(model: Arc<StubModel>) -> Registry {
        let mut registry = configure_registry(&ExtractionConfig::default()).unwrap();
        registry.register_ai_model("stub", model);
        registry
    }

    fn photo() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn default_registry_has_generators_only() {
        let registry = configure_registry(&ExtractionConfig::default()).unwrap();
        assert!(registry.list_names(CapabilityKind::AiModel).is_empty());
        assert!(registry.list_names(CapabilityKind::TextExtractor).is_empty());
        assert_eq!(
            registry.list_names(CapabilityKind::OutputGenerator),
            vec!["CSV", "TABLE", "MARC21", "BIBFRAME2"]
        );
    }

    #[test]
    fn anthropic_registered_when_key_present() {
        let config = ExtractionConfig::builder().anthropic_api_key("sk-test").build().unwrap();
        let registry = configure_registry(&config).unwrap();
        assert_eq!(registry.list_names(CapabilityKind::AiModel), vec!["anthropic"]);
    }

    #[tokio::test]
    async fn injected_provider_registered_as_custom() {
        let mock = edgequake_llm::MockProvider::new();
        mock.add_response(REPLY).await;
        let config = ExtractionConfig::builder().provider(Arc::new(mock)).build().unwrap();

        let registry = configure_registry(&config).unwrap();
        assert_eq!(registry.list_names(CapabilityKind::AiModel), vec!["custom"]);

        let out = process(&registry, &[photo()], "custom", "CSV").await.unwrap();
        assert_eq!(out, Formatted::Text("Title,Author\nEmma,Jane Austen\n".into()));
    }

    #[test]
    fn injected_provider_uses_provider_name() {
        let config = ExtractionConfig::builder()
            .provider_name("openai")
            .provider(Arc::new(edgequake_llm::MockProvider::new()))
            .build()
            .unwrap();
        let registry = configure_registry(&config).unwrap();
        assert_eq!(registry.list_names(CapabilityKind::AiModel), vec!["openai"]);
    }

    #[tokio::test]
    async fn process_renders_csv() {
        let model = Arc::new(StubModel::default());
        let registry = registry_with(Arc::clone(&model));

        let out = process(&registry, &[photo(), photo()], "stub", "CSV").await.unwrap();
        assert_eq!(out, Formatted::Text("Title,Author\nEmma,Jane Austen\n".into()));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1, "one call per book");
    }

    #[tokio::test]
    async fn unknown_format_never_calls_model() {
        let model = Arc::new(StubModel::default());
        let registry = registry_with(Arc::clone(&model));

        let err = process(&registry, &[photo()], "stub", "XML").await.unwrap_err();
        match err {
            BookMetaError::CapabilityNotFound { kind, name } => {
                assert_eq!(kind, CapabilityKind::OutputGenerator);
                assert_eq!(name, "XML");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_model_is_reported() {
        let registry = registry_with(Arc::new(StubModel::default()));
        let err = process(&registry, &[photo()], "gpt-9", "CSV").await.unwrap_err();
        assert!(matches!(
            err,
            BookMetaError::CapabilityNotFound {
                kind: CapabilityKind::AiModel,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_images_rejected_before_call() {
        let model = Arc::new(StubModel::default());
        let registry = registry_with(Arc::clone(&model));
        let err = process(&registry, &[], "stub", "TABLE").await.unwrap_err();
        assert!(matches!(err, BookMetaError::EmptyImageSet));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reserved_format_fails_before_model_call() {
        let model = Arc::new(StubModel::default());
        let registry = registry_with(Arc::clone(&model));
        for format in ["MARC21", "BIBFRAME2"] {
            let err = process(&registry, &[photo()], "stub", format).await.unwrap_err();
            assert!(
                matches!(err, BookMetaError::FormatNotImplemented { format: ref f } if f == format),
                "{format}: {err:?}"
            );
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn process_sync_outside_runtime() {
        let registry = registry_with(Arc::new(StubModel::default()));
        let out = process_sync(&registry, &[photo()], "stub", "TABLE").unwrap();
        assert_eq!(out.rows().map(|r| r.len()), Some(1));
    }
}
