//! Eager batch entry points: process a folder of book photos, then return.
//!
//! [`process_batch`] drives [`crate::stream::process_stream`] to completion
//! and computes [`BatchStats`]. Use the stream directly when results should
//! be shown as each book finishes.

use crate::error::BookMetaError;
use crate::output::{BatchOutput, BatchStats, BookResult, Formatted};
use crate::pipeline::generate::to_csv;
use crate::pipeline::input;
use crate::process::resolve_pair;
use crate::registry::Registry;
use crate::stream::{process_stream, BatchOptions};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Process every grouped book and collect the results in book-key order.
///
/// Both capability names are checked before any image is loaded. Individual
/// book failures are recorded in the output; see
/// [`BatchOutput::into_result`] to treat them as an error.
///
/// # Errors
/// - [`BookMetaError::CapabilityNotFound`] for an unregistered name
/// - [`BookMetaError::FormatNotImplemented`] for a reserved format
/// - [`BookMetaError::AllBooksFailed`] when no book succeeded
pub async fn process_batch(
    registry: Arc<Registry>,
    books: BTreeMap<String, Vec<PathBuf>>,
    options: BatchOptions,
) -> Result<BatchOutput, BookMetaError> {
    let total_start = Instant::now();
    resolve_pair(&registry, &options.model_name, &options.format_name)?;

    let total_books = books.len();
    let total_images: usize = books.values().map(Vec::len).sum();
    info!(
        "Processing {} books ({} images) with '{}' → {}",
        total_books, total_images, options.model_name, options.format_name
    );

    let progress = options.progress.clone();
    if let Some(ref cb) = progress {
        cb.on_batch_start(total_books);
    }

    let results: Vec<BookResult> = process_stream(registry, books, options).collect().await;

    let processed = results.iter().filter(|b| b.is_success()).count();
    let failed = results.len() - processed;

    if let Some(ref cb) = progress {
        cb.on_batch_complete(total_books, processed);
    }

    if total_books > 0 && processed == 0 {
        let first_error = results
            .iter()
            .find_map(|b| b.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(BookMetaError::AllBooksFailed {
            total: total_books,
            first_error,
        });
    }

    let stats = BatchStats {
        total_books,
        processed_books: processed,
        failed_books: failed,
        total_images,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Batch complete: {}/{} books, {}ms total",
        processed, total_books, stats.total_duration_ms
    );

    Ok(BatchOutput {
        books: results,
        stats,
    })
}

/// Collect the images in `folder`, group them by book and process the batch.
///
/// # Errors
/// - [`BookMetaError::FileNotFound`] / [`BookMetaError::PermissionDenied`]
///   for an unreadable folder
/// - [`BookMetaError::NoImagesFound`] when the folder holds no image
/// - everything [`process_batch`] returns
pub async fn process_folder(
    registry: Arc<Registry>,
    folder: impl AsRef<Path>,
    options: BatchOptions,
) -> Result<BatchOutput, BookMetaError> {
    let folder = folder.as_ref();
    let paths = input::collect_images(folder)?;
    if paths.is_empty() {
        return Err(BookMetaError::NoImagesFound {
            folder: folder.to_path_buf(),
        });
    }
    let books = input::group_by_book(&paths);
    process_batch(registry, books, options).await
}

/// Write an output to `path`.
///
/// Text is written verbatim; a table is rendered as CSV. Uses an atomic
/// write (temp file + rename) so a failed run never leaves a partial file.
/// The temp file is removed when the rename fails.
pub async fn write_output(path: impl AsRef<Path>, output: &Formatted) -> Result<(), BookMetaError> {
    let path = path.as_ref();
    let body = match output {
        Formatted::Text(text) => text.clone(),
        Formatted::Table(rows) => to_csv(rows),
    };

    let write_err = |e: std::io::Error| BookMetaError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}
