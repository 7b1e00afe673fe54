//! Output generators: row records → target representation.
//!
//! | Registry name | Generator | Output |
//! |---------------|-----------|--------|
//! | `CSV`         | [`CsvGenerator`]       | `Formatted::Text` |
//! | `TABLE`       | [`TableGenerator`]     | `Formatted::Table` (identity) |
//! | `MARC21`      | [`Marc21Generator`]    | not implemented |
//! | `BIBFRAME2`   | [`Bibframe2Generator`] | not implemented |

use crate::capability::OutputGenerator;
use crate::error::BookMetaError;
use crate::output::{Formatted, RowRecord};
use std::borrow::Cow;

pub const CSV_FORMAT: &str = "CSV";
pub const TABLE_FORMAT: &str = "TABLE";
pub const MARC21_FORMAT: &str = "MARC21";
pub const BIBFRAME2_FORMAT: &str = "BIBFRAME2";

/// Comma-separated text with one header line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvGenerator;

impl OutputGenerator for CsvGenerator {
    fn generate(&self, rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError> {
        Ok(Formatted::Text(to_csv(&rows)))
    }
}

/// Hands the records through unchanged for a tabular renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableGenerator;

impl OutputGenerator for TableGenerator {
    fn generate(&self, rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError> {
        Ok(Formatted::Table(rows))
    }
}

/// MARC 21 bibliographic records. Registered so the format can be selected,
/// but no encoder exists yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marc21Generator;

impl OutputGenerator for Marc21Generator {
    fn generate(&self, _rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError> {
        Err(not_implemented(MARC21_FORMAT))
    }

    fn ensure_supported(&self) -> Result<(), BookMetaError> {
        Err(not_implemented(MARC21_FORMAT))
    }
}

/// BIBFRAME 2.0 descriptions. Registered so the format can be selected, but
/// no encoder exists yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bibframe2Generator;

impl OutputGenerator for Bibframe2Generator {
    fn generate(&self, _rows: Vec<RowRecord>) -> Result<Formatted, BookMetaError> {
        Err(not_implemented(BIBFRAME2_FORMAT))
    }

    fn ensure_supported(&self) -> Result<(), BookMetaError> {
        Err(not_implemented(BIBFRAME2_FORMAT))
    }
}

fn not_implemented(format: &str) -> BookMetaError {
    BookMetaError::FormatNotImplemented {
        format: format.to_string(),
    }
}

/// Render records as CSV.
///
/// The header comes from the first record's columns; later records are
/// written in that column order with missing cells left empty and extra
/// columns dropped. Every line, the last included, ends with `\n`. Cells
/// containing a comma, quote or line break are quoted with inner quotes
/// doubled. No records → empty string.
pub fn to_csv(rows: &[RowRecord]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<&str> = first.columns().collect();

    let mut out = String::new();
    push_line(&mut out, headers.iter().copied());
    for row in rows {
        push_line(&mut out, headers.iter().map(|h| row.get(h).unwrap_or("")));
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_cell(cell));
    }
    out.push('\n');
}

fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}
