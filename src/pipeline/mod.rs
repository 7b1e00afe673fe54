//! Pipeline stages for book-photo metadata extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ anthropic / llm ──▶ table ──▶ generate
//! (files)   (base64)   (one VLM call)      (rows)    (CSV, table, …)
//! ```
//!
//! 1. [`input`]: list image files, group them by book, decode them
//! 2. [`encode`]: JPEG-encode and base64-wrap each `DynamicImage`
//! 3. [`anthropic`]: Anthropic Messages API adapter (direct HTTP)
//! 4. [`llm`]: adapter over any edgequake-llm vision provider
//! 5. [`table`]: markdown-table reply → row records
//! 6. [`generate`]: row records → CSV text, table, or placeholder formats

pub mod anthropic;
pub mod encode;
pub mod generate;
pub mod input;
pub mod llm;
pub mod table;
