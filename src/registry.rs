//! Name-keyed registry of pipeline capabilities.
//!
//! Three independent maps, one per [`CapabilityKind`]. Entries are added at
//! start-up and read many times afterwards; there is no removal. Registering
//! an existing name replaces the instance but keeps the name's original
//! position, so [`Registry::list_names`] always reports registration order.

use crate::capability::{AiModel, OutputGenerator, TextExtractor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The three kinds of pluggable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    TextExtractor,
    AiModel,
    OutputGenerator,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapabilityKind::TextExtractor => "text extractor",
            CapabilityKind::AiModel => "AI model",
            CapabilityKind::OutputGenerator => "output generator",
        };
        f.write_str(s)
    }
}

/// A registered capability instance, tagged with its kind.
#[derive(Clone)]
pub enum Capability {
    TextExtractor(Arc<dyn TextExtractor>),
    AiModel(Arc<dyn AiModel>),
    OutputGenerator(Arc<dyn OutputGenerator>),
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::TextExtractor(_) => CapabilityKind::TextExtractor,
            Capability::AiModel(_) => CapabilityKind::AiModel,
            Capability::OutputGenerator(_) => CapabilityKind::OutputGenerator,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability::{:?}", self.kind())
    }
}

/// Holds every named capability available to the pipeline.
///
/// Immutable once populated; wrap it in an `Arc` to share it between the
/// batch stream and the caller.
#[derive(Default, Clone)]
pub struct Registry {
    text_extractors: IndexMap<String, Arc<dyn TextExtractor>>,
    ai_models: IndexMap<String, Arc<dyn AiModel>>,
    output_generators: IndexMap<String, Arc<dyn OutputGenerator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `capability` under `name` within its kind. Last write wins.
    pub fn register(&mut self, name: impl Into<String>, capability: Capability) {
        let name = name.into();
        debug!("Registering {} '{}'", capability.kind(), name);
        match capability {
            Capability::TextExtractor(c) => {
                self.text_extractors.insert(name, c);
            }
            Capability::AiModel(c) => {
                self.ai_models.insert(name, c);
            }
            Capability::OutputGenerator(c) => {
                self.output_generators.insert(name, c);
            }
        }
    }

    pub fn register_text_extractor(&mut self, name: impl Into<String>, extractor: Arc<dyn TextExtractor>) {
        self.register(name, Capability::TextExtractor(extractor));
    }

    pub fn register_ai_model(&mut self, name: impl Into<String>, model: Arc<dyn AiModel>) {
        self.register(name, Capability::AiModel(model));
    }

    pub fn register_output_generator(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn OutputGenerator>,
    ) {
        self.register(name, Capability::OutputGenerator(generator));
    }

    /// Exact-match lookup. `None` means "not configured".
    pub fn resolve(&self, kind: CapabilityKind, name: &str) -> Option<Capability> {
        match kind {
            CapabilityKind::TextExtractor => self.text_extractor(name).map(Capability::TextExtractor),
            CapabilityKind::AiModel => self.ai_model(name).map(Capability::AiModel),
            CapabilityKind::OutputGenerator => {
                self.output_generator(name).map(Capability::OutputGenerator)
            }
        }
    }

    pub fn text_extractor(&self, name: &str) -> Option<Arc<dyn TextExtractor>> {
        self.text_extractors.get(name).cloned()
    }

    pub fn ai_model(&self, name: &str) -> Option<Arc<dyn AiModel>> {
        self.ai_models.get(name).cloned()
    }

    pub fn output_generator(&self, name: &str) -> Option<Arc<dyn OutputGenerator>> {
        self.output_generators.get(name).cloned()
    }

    pub fn contains(&self, kind: CapabilityKind, name: &str) -> bool {
        match kind {
            CapabilityKind::TextExtractor => self.text_extractors.contains_key(name),
            CapabilityKind::AiModel => self.ai_models.contains_key(name),
            CapabilityKind::OutputGenerator => self.output_generators.contains_key(name),
        }
    }

    /// Registered names of one kind, in registration order.
    pub fn list_names(&self, kind: CapabilityKind) -> Vec<String> {
        match kind {
            CapabilityKind::TextExtractor => self.text_extractors.keys().cloned().collect(),
            CapabilityKind::AiModel => self.ai_models.keys().cloned().collect(),
            CapabilityKind::OutputGenerator => self.output_generators.keys().cloned().collect(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("text_extractors", &self.list_names(CapabilityKind::TextExtractor))
            .field("ai_models", &self.list_names(CapabilityKind::AiModel))
            .field("output_generators", &self.list_names(CapabilityKind::OutputGenerator))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookMetaError;
    use crate::output::{Formatted, RowRecord};
    use image::DynamicImage;

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, BookMetaError> {
            Ok(self.0.to_string())
        }
    }

    struct Echo;

    impl OutputGenerator for Echo {
        fn generate(&self, rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError> {
            Ok(Formatted::Table(rows))
        }
    }

    #[test]
    fn resolve_returns_registered_instance() {
        let mut registry = Registry::new();
        let extractor: Arc<dyn TextExtractor> = Arc::new(FixedText("spine"));
        registry.register_text_extractor("default", Arc::clone(&extractor));

        let found = registry.text_extractor("default").expect("registered");
        assert!(Arc::ptr_eq(&found, &extractor));
        let img = DynamicImage::new_rgb8(1, 1);
        assert_eq!(found.extract_text(&img).unwrap(), "spine");
    }

    #[test]
    fn resolve_absent_is_none() {
        let registry = Registry::new();
        assert!(registry.resolve(CapabilityKind::AiModel, "anthropic").is_none());
        assert!(registry.output_generator("CSV").is_none());
    }

    #[test]
    fn reregistering_overwrites_and_keeps_length() {
        let mut registry = Registry::new();
        registry.register_text_extractor("a", Arc::new(FixedText("first")));
        registry.register_text_extractor("b", Arc::new(FixedText("other")));
        registry.register_text_extractor("a", Arc::new(FixedText("second")));

        assert_eq!(
            registry.list_names(CapabilityKind::TextExtractor),
            vec!["a".to_string(), "b".to_string()]
        );
        let img = DynamicImage::new_rgb8(1, 1);
        let text = registry.text_extractor("a").unwrap().extract_text(&img).unwrap();
        assert_eq!(text, "second");
    }

    #[test]
    fn kinds_are_independent() {
        let mut registry = Registry::new();
        registry.register_output_generator("shared", Arc::new(Echo));

        assert!(registry.contains(CapabilityKind::OutputGenerator, "shared"));
        assert!(!registry.contains(CapabilityKind::TextExtractor, "shared"));
        assert!(registry.list_names(CapabilityKind::AiModel).is_empty());
    }

    #[test]
    fn generic_register_routes_by_kind() {
        let mut registry = Registry::new();
        let cap = Capability::OutputGenerator(Arc::new(Echo));
        assert_eq!(cap.kind(), CapabilityKind::OutputGenerator);
        registry.register("TABLE", cap);

        let resolved = registry
            .resolve(CapabilityKind::OutputGenerator, "TABLE")
            .expect("registered");
        assert_eq!(resolved.kind(), CapabilityKind::OutputGenerator);
    }

    #[test]
    fn list_names_preserves_registration_order() {
        let mut registry = Registry::new();
        for name in ["CSV", "MARC21", "BIBFRAME2", "TABLE"] {
            registry.register_output_generator(name, Arc::new(Echo));
        }
        assert_eq!(
            registry.list_names(CapabilityKind::OutputGenerator),
            vec!["CSV", "MARC21", "BIBFRAME2", "TABLE"]
        );
    }
}
