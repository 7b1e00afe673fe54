//! Result types: row records, formatted output, per-book and batch results.

use crate::error::{BookError, BookMetaError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One parsed table row: column name → cell value, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord(IndexMap<String, String>);

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell. An existing column keeps its position and takes the
    /// new value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RowRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// What an output generator produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Formatted {
    /// Serialised text (CSV, or any other text format).
    Text(String),
    /// Row records handed through for a tabular renderer.
    Table(Vec<RowRecord>),
}

impl Formatted {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Formatted::Text(s) => Some(s),
            Formatted::Table(_) => None,
        }
    }

    pub fn rows(&self) -> Option<&[RowRecord]> {
        match self {
            Formatted::Table(rows) => Some(rows),
            Formatted::Text(_) => None,
        }
    }
}

/// Outcome of one book of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResult {
    /// Grouping key (file-name prefix before the first underscore).
    pub book: String,
    pub image_paths: Vec<PathBuf>,
    /// `None` when the book failed; see `error`.
    pub output: Option<Formatted>,
    pub duration_ms: u64,
    pub error: Option<BookError>,
}

impl BookResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_books: usize,
    pub processed_books: usize,
    pub failed_books: usize,
    pub total_images: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch produced, in book-key order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub books: Vec<BookResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Merge the successful books into one output.
    ///
    /// Table outputs are concatenated row-wise; text outputs are joined with
    /// a newline. Returns `None` when no book succeeded. When a batch mixes
    /// both shapes (only possible with a custom generator), tables are
    /// rendered to CSV text first.
    pub fn combined(&self) -> Option<Formatted> {
        let outputs: Vec<&Formatted> = self.books.iter().filter_map(|b| b.output.as_ref()).collect();
        if outputs.is_empty() {
            return None;
        }

        if outputs.iter().all(|o| matches!(o, Formatted::Table(_))) {
            let rows = outputs
                .into_iter()
                .filter_map(Formatted::rows)
                .flat_map(|rows| rows.iter().cloned())
                .collect();
            return Some(Formatted::Table(rows));
        }

        let text = outputs
            .into_iter()
            .map(|o| match o {
                Formatted::Text(s) => s.clone(),
                Formatted::Table(rows) => crate::pipeline::generate::to_csv(rows),
            })
            .collect::<Vec<_>>()
            .join("\n");
        Some(Formatted::Text(text))
    }

    /// Treat any failed book as an error.
    pub fn into_result(self) -> Result<Self, BookMetaError> {
        if self.stats.failed_books > 0 {
            return Err(BookMetaError::PartialFailure {
                success: self.stats.processed_books,
                failed: self.stats.failed_books,
                total: self.stats.total_books,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RowRecord {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn book(key: &str, output: Option<Formatted>) -> BookResult {
        let error = output.is_none().then(|| BookError::ExtractionFailed {
            book: key.to_string(),
            detail: "boom".into(),
        });
        BookResult {
            book: key.to_string(),
            image_paths: vec![],
            output,
            duration_ms: 0,
            error,
        }
    }

    #[test]
    fn row_record_keeps_column_order() {
        let r = record(&[("Title", "Dune"), ("Author", "Herbert"), ("ISBN", "x")]);
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["Title", "Author", "ISBN"]);
    }

    #[test]
    fn duplicate_column_overwrites_in_place() {
        let r = record(&[("A", "1"), ("B", "2"), ("A", "3")]);
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("A"), Some("3"));
        assert_eq!(r.columns().next(), Some("A"));
    }

    #[test]
    fn row_record_serialises_as_ordered_object() {
        let r = record(&[("Title", "Emma"), ("Author", "Austen")]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Title":"Emma","Author":"Austen"}"#);
    }

    #[test]
    fn combined_concatenates_tables_and_skips_failures() {
        let out = BatchOutput {
            books: vec![
                book("a", Some(Formatted::Table(vec![record(&[("T", "1")])]))),
                book("b", None),
                book("c", Some(Formatted::Table(vec![record(&[("T", "2")])]))),
            ],
            stats: BatchStats::default(),
        };
        let combined = out.combined().expect("two books succeeded");
        assert_eq!(combined.rows().map(<[RowRecord]>::len), Some(2));
    }

    #[test]
    fn combined_joins_text() {
        let out = BatchOutput {
            books: vec![
                book("a", Some(Formatted::Text("T\n1\n".into()))),
                book("b", Some(Formatted::Text("T\n2\n".into()))),
            ],
            stats: BatchStats::default(),
        };
        assert_eq!(out.combined(), Some(Formatted::Text("T\n1\n\nT\n2\n".into())));
    }

    #[test]
    fn combined_none_when_everything_failed() {
        let out = BatchOutput {
            books: vec![book("a", None)],
            stats: BatchStats::default(),
        };
        assert!(out.combined().is_none());
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let out = BatchOutput {
            books: vec![],
            stats: BatchStats {
                total_books: 3,
                processed_books: 2,
                failed_books: 1,
                ..Default::default()
            },
        };
        let err = out.into_result().unwrap_err();
        assert!(matches!(err, BookMetaError::PartialFailure { failed: 1, .. }));
    }
}
