//! Error types for the edgequake-bookmeta library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BookMetaError`] is **fatal**: the call cannot produce a result at all
//!   (capability not registered, remote model rejected the request, image
//!   unreadable). Returned as `Err(BookMetaError)` from [`crate::process::process`]
//!   and the batch entry points.
//!
//! * [`BookError`] is **non-fatal**: one book of a batch failed but the
//!   remaining books are still attempted. Stored inside
//!   [`crate::output::BookResult`] so callers can inspect partial success.

use crate::registry::CapabilityKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-bookmeta library.
///
/// Per-book failures inside a batch use [`BookError`] and are stored in
/// [`crate::output::BookResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BookMetaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file or folder was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but could not be decoded as an image.
    #[error("File is not a readable image: '{path}': {detail}")]
    NotAnImage { path: PathBuf, detail: String },

    /// The folder contains no `.png`, `.jpg` or `.jpeg` files.
    #[error("No images found in folder: '{folder}'")]
    NoImagesFound { folder: PathBuf },

    /// The orchestrator was called with zero images.
    #[error("At least one image is required to extract book metadata")]
    EmptyImageSet,

    /// An image could not be re-encoded for transport.
    #[error("Image encoding failed: {detail}")]
    ImageEncodingFailed { detail: String },

    // ── Configuration errors ──────────────────────────────────────────────
    /// A capability name was not found in the registry.
    #[error("{kind} '{name}' is not registered")]
    CapabilityNotFound { kind: CapabilityKind, name: String },

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote model errors ───────────────────────────────────────────────
    /// The model API returned a non-retryable error or could not be reached.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Model API returned HTTP 429.
    ///
    /// `retry_after_secs` carries the server-specified delay when present.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Model API call exceeded the configured timeout.
    #[error("API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// Model API returned 401/403.
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output format is registered but has no encoder yet.
    #[error("Output format '{format}' is not implemented yet")]
    FormatNotImplemented { format: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every book of a batch failed; there is nothing to write.
    #[error("All {total} books failed.\nFirst error: {first_error}")]
    AllBooksFailed { total: usize, first_error: String },

    /// Some books succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any book failure as an error.
    #[error("{failed}/{total} books failed during extraction")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single book of a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum BookError {
    /// One of the book's images could not be loaded.
    #[error("Book '{book}': image load failed: {detail}")]
    LoadFailed { book: String, detail: String },

    /// The model call or output generation failed.
    #[error("Book '{book}': extraction failed: {detail}")]
    ExtractionFailed { book: String, detail: String },
}

impl BookError {
    /// The grouping key of the book that failed.
    pub fn book(&self) -> &str {
        match self {
            BookError::LoadFailed { book, .. } | BookError::ExtractionFailed { book, .. } => book,
        }
    }
}
