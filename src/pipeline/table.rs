//! Markdown-table reply → row records.
//!
//! The model is asked for a single GFM pipe table. This parser is
//! deliberately lenient: it does not check column counts or escaped pipes.
//! Anything between the first and last `|` of a line counts as a table row;
//! every other line (prose, blank lines, code fences) is ignored.

use crate::output::RowRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_TABLE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|(.+)\|").unwrap());

/// Parse the first markdown table found in `text`.
///
/// 1. The first pipe-delimited line is the header.
/// 2. The second is the header/body separator and is skipped whatever it
///    contains.
/// 3. Every later pipe-delimited line is zipped positionally against the
///    header: missing trailing cells leave their columns out of the record,
///    surplus cells are dropped.
///
/// Text without any pipe-delimited line yields an empty vector.
pub fn parse_markdown_table(text: &str) -> Vec<RowRecord> {
    let text = normalise(text);
    let mut rows = text.lines().filter_map(row_cells);

    let Some(headers) = rows.next() else {
        return Vec::new();
    };

    rows.skip(1)
        .map(|cells| -> RowRecord {
            headers
                .iter()
                .zip(cells)
                .map(|(h, c)| (h.clone(), c))
                .collect()
        })
        .collect()
}

/// Trimmed cells of a table line, or `None` when the line is not one.
fn row_cells(line: &str) -> Option<Vec<String>> {
    let caps = RE_TABLE_ROW.captures(line)?;
    Some(caps[1].split('|').map(|c| c.trim().to_string()).collect())
}

/// CRLF → LF and removal of invisible characters that models sometimes emit
/// inside cells (zero-width spaces, BOM, soft hyphens).
fn normalise(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(
            ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
            "",
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> RowRecord {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn well_formed_table() {
        let input = "| Title | ISBN |\n| --- | --- |\n| Moby Dick | 9780142437247 |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("Title", "Moby Dick"), ("ISBN", "9780142437247")])]);
    }

    #[test]
    fn no_table_is_empty() {
        assert!(parse_markdown_table("").is_empty());
        assert!(parse_markdown_table("I could not read the cover.\nSorry.").is_empty());
        // a single pipe is not a delimited line
        assert!(parse_markdown_table("Title: A | B").is_empty());
    }

    #[test]
    fn prose_around_table_is_ignored() {
        let input = "Here is the information:\n\n\
                     | Field | Value |\n\
                     |:------|------:|\n\
                     | Title | Emma |\n\
                     \n\
                     Let me know if you need more.";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("Field", "Title"), ("Value", "Emma")])]);
    }

    #[test]
    fn second_line_skipped_even_if_data() {
        let input = "| A | B |\n| 1 | 2 |\n| 3 | 4 |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("A", "3"), ("B", "4")])]);
    }

    #[test]
    fn short_row_omits_trailing_columns() {
        let input = "| Title | Author | ISBN |\n|---|---|---|\n| Dune | Herbert |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0].get("ISBN"), None);
    }

    #[test]
    fn long_row_drops_surplus_cells() {
        let input = "| Title |\n|---|\n| Dune | extra | more |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("Title", "Dune")])]);
    }

    #[test]
    fn header_only_table_has_no_rows() {
        assert!(parse_markdown_table("| Title | ISBN |\n| --- | --- |").is_empty());
    }

    #[test]
    fn multiple_rows_share_header() {
        let input = "| Title | Year |\n|---|---|\n| A | 1999 |\n| B | 2001 |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.columns().collect::<Vec<_>>() == ["Title", "Year"]));
        assert_eq!(rows[1].get("Year"), Some("2001"));
    }

    #[test]
    fn crlf_and_invisible_chars_are_normalised() {
        let input = "\u{FEFF}| Title | ISBN |\r\n| --- | --- |\r\n| Emma\u{200B} | 123 |\r\n";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("Title", "Emma"), ("ISBN", "123")])]);
    }

    #[test]
    fn text_outside_outer_pipes_is_ignored() {
        let input = "> | A | B | trailing\n| - | - |\n  | 1 | 2 |  ";
        let rows = parse_markdown_table(input);
        assert_eq!(rows, vec![record(&[("A", "1"), ("B", "2")])]);
    }

    #[test]
    fn empty_cells_are_kept() {
        let input = "| Title | Subtitle |\n|---|---|\n| Emma |  |";
        let rows = parse_markdown_table(input);
        assert_eq!(rows[0].get("Subtitle"), Some(""));
    }
}
