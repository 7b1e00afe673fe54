//! Capability traits: the three pluggable strategy kinds of the pipeline.
//!
//! Each trait is object-safe and `Send + Sync` so instances can live in the
//! [`crate::registry::Registry`] as `Arc<dyn …>` and be shared across tasks.
//! Concrete variants are selected at run time by the name they were
//! registered under, never by their Rust type.

use crate::error::BookMetaError;
use crate::output::{Formatted, RowRecord};
use crate::pipeline::table::parse_markdown_table;
use async_trait::async_trait;
use image::DynamicImage;

/// Turns a single image into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, BookMetaError>;
}

/// A multimodal model that reads all images of one book in a single call.
#[async_trait]
pub trait AiModel: Send + Sync {
    /// Send every image plus the extraction instruction in one request and
    /// return the model's raw reply.
    ///
    /// Implementations must not retry and must not substitute placeholder
    /// text when the remote call fails.
    async fn complete(&self, images: &[DynamicImage]) -> Result<String, BookMetaError>;

    /// [`complete`](AiModel::complete) followed by the markdown-table parser.
    ///
    /// A reply without a table yields `Ok(vec![])`.
    async fn process(&self, images: &[DynamicImage]) -> Result<Vec<RowRecord>, BookMetaError> {
        let reply = self.complete(images).await?;
        Ok(parse_markdown_table(&reply))
    }
}

/// Renders row records into a target representation.
pub trait OutputGenerator: Send + Sync {
    fn generate(&self, rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError>;

    /// Fails when [`generate`](Self::generate) cannot produce output for any
    /// input. Checked before a model is called.
    fn ensure_supported(&self) -> Result<(), BookMetaError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generate::CsvGenerator;

    struct Echo(&'static str);

    #[async_trait]
    impl AiModel for Echo {
        async fn complete(&self, _images: &[DynamicImage]) -> Result<String, BookMetaError> {
            Ok(self.0.to_string())
        }
    }

    struct Blank;

    impl TextExtractor for Blank {
        fn extract_text(&self, _image: &DynamicImage) -> Result<String, BookMetaError> {
            Ok(String::new())
        }
    }

    #[test]
    fn default_process_parses_the_reply() {
        let model = Echo("| ISBN |\n|---|\n| 0141439513 |");
        let rows = tokio_test::block_on(model.process(&[DynamicImage::new_rgb8(1, 1)])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("ISBN"), Some("0141439513"));
    }

    #[test]
    fn reply_without_table_is_not_an_error() {
        let model = Echo("Sorry, the photo is too blurry.");
        let rows = tokio_test::block_on(model.process(&[DynamicImage::new_rgb8(1, 1)])).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn traits_are_object_safe() {
        let _: Box<dyn AiModel> = Box::new(Echo(""));
        let _: Box<dyn OutputGenerator> = Box::new(CsvGenerator);
        let extractor: Box<dyn TextExtractor> = Box::new(Blank);
        assert_eq!(extractor.extract_text(&DynamicImage::new_rgb8(1, 1)).unwrap(), "");
    }
}
