//! Streaming batch API: emit one result per book as it completes.
//!
//! A shelf of books takes minutes to get through. [`process_stream`] yields a
//! [`BookResult`] for each book as soon as its model call returns, so callers
//! can show partial results or write them out incrementally. Books are
//! processed one at a time, in book-key order.

use crate::error::{BookError, BookMetaError};
use crate::output::{BookResult, Formatted};
use crate::pipeline::input;
use crate::process::{extract, resolve_pair};
use crate::progress::ProgressCallback;
use crate::registry::Registry;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-book results.
pub type BookStream = Pin<Box<dyn Stream<Item = BookResult> + Send>>;

/// Names of the capabilities a batch uses, plus an optional progress sink.
#[derive(Clone)]
pub struct BatchOptions {
    pub model_name: String,
    pub format_name: String,
    pub progress: Option<ProgressCallback>,
}

impl BatchOptions {
    pub fn new(model_name: impl Into<String>, format_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            format_name: format_name.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("model_name", &self.model_name)
            .field("format_name", &self.format_name)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Process grouped books one after another, yielding a result per book.
///
/// A book that fails (unreadable image, model error, unregistered name)
/// yields a [`BookResult`] carrying a [`BookError`]; the next book is still
/// attempted. Per-book progress events fire as the stream is polled.
pub fn process_stream(
    registry: Arc<Registry>,
    books: BTreeMap<String, Vec<PathBuf>>,
    options: BatchOptions,
) -> BookStream {
    let total = books.len();
    let s = stream::iter(books.into_iter().enumerate()).then(move |(i, (book, paths))| {
        let registry = Arc::clone(&registry);
        let options = options.clone();
        async move { process_book(&registry, book, paths, i + 1, total, &options).await }
    });
    Box::pin(s)
}

/// Load, extract and render a single book. Never fails; errors are stored in
/// the returned result.
pub async fn process_book(
    registry: &Registry,
    book: String,
    image_paths: Vec<PathBuf>,
    index: usize,
    total: usize,
    options: &BatchOptions,
) -> BookResult {
    let start = Instant::now();
    info!("Book {}/{} '{}': {} images", index, total, book, image_paths.len());
    if let Some(ref cb) = options.progress {
        cb.on_book_start(&book, index, total);
    }

    let outcome = match input::load_images(&image_paths).await {
        Err(e) => Err(BookError::LoadFailed {
            book: book.clone(),
            detail: e.to_string(),
        }),
        Ok(images) => extract_book(registry, options, &images)
            .await
            .map_err(|e| BookError::ExtractionFailed {
                book: book.clone(),
                detail: e.to_string(),
            }),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok((output, rows)) => {
            info!("Book '{}' done: {} rows in {}ms", book, rows, duration_ms);
            if let Some(ref cb) = options.progress {
                cb.on_book_complete(&book, index, total, rows);
            }
            BookResult {
                book,
                image_paths,
                output: Some(output),
                duration_ms,
                error: None,
            }
        }
        Err(e) => {
            warn!("{}", e);
            if let Some(ref cb) = options.progress {
                cb.on_book_error(&book, index, total, &e.to_string());
            }
            BookResult {
                book,
                image_paths,
                output: None,
                duration_ms,
                error: Some(e),
            }
        }
    }
}

async fn extract_book(
    registry: &Registry,
    options: &BatchOptions,
    images: &[DynamicImage],
) -> Result<(Formatted, usize), BookMetaError> {
    let (model, generator) = resolve_pair(registry, &options.model_name, &options.format_name)?;
    extract(model.as_ref(), generator.as_ref(), images).await
}
