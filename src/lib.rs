//! # edgequake-bookmeta
//!
//! Extract bibliographic metadata from photos of books using multimodal
//! language models.
//!
//! ## Why this crate?
//!
//! Cataloguing a shelf by hand means typing title, author, publisher and
//! ISBN for every volume. This crate takes the photos instead (front cover,
//! title page, back cover with the barcode), sends all photos of one book to
//! a vision model in a single request and turns the markdown table it
//! answers with into CSV or structured rows.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder of photos
//!  │
//!  ├─ 1. Input     list .jpg/.png, group by prefix before the first `_`
//!  ├─ 2. Decode    image files → DynamicImage (spawn_blocking)
//!  ├─ 3. Encode    RGB → JPEG → base64
//!  ├─ 4. Model     one request per book: all images + the instruction
//!  ├─ 5. Parse     markdown table → row records
//!  └─ 6. Generate  CSV text / TABLE rows (MARC21, BIBFRAME2 reserved)
//! ```
//!
//! Models and output formats are looked up by name in a [`Registry`], so
//! callers can plug in their own [`AiModel`] or [`OutputGenerator`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_bookmeta::{configure_registry, process_folder, BatchOptions, ExtractionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ANTHROPIC_API_KEY (or ANTHROPIC_KEY)
//!     let config = ExtractionConfig::from_env();
//!     let registry = Arc::new(configure_registry(&config)?);
//!     let output = process_folder(registry, "photos/", BatchOptions::new("anthropic", "CSV")).await?;
//!     if let Some(csv) = output.combined() {
//!         println!("{}", csv.as_text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `book2table` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-bookmeta = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_batch, process_folder, write_output};
pub use capability::{AiModel, OutputGenerator, TextExtractor};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{BookError, BookMetaError};
pub use output::{BatchOutput, BatchStats, BookResult, Formatted, RowRecord};
pub use pipeline::input::{book_key, collect_images, group_by_book, load_image};
pub use pipeline::table::parse_markdown_table;
pub use process::{configure_registry, process, process_sync};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{Capability, CapabilityKind, Registry};
pub use stream::{process_stream, BatchOptions, BookStream};
