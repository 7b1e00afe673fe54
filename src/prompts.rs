//! Instruction prompts sent alongside the book photos.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::instruction`]; the constant here is used
//! only when no override is provided.

/// Default instruction appended after the images of one book.
///
/// The reply must be a single markdown table because
/// [`crate::pipeline::table::parse_markdown_table`] only reads pipe-delimited
/// lines: the first is taken as the header and the second is skipped as the
/// separator.
pub const BOOK_METADATA_PROMPT: &str = r#"These images show the covers and pages of ONE book. Extract the bibliographic information of the book from them.

Important: include the ISBN of the book.

Rules:
- Combine information from all images (e.g. the title on the front cover and the ISBN on the back cover)
- Use these columns when the information is visible: Title, Subtitle, Author, Publisher, Place, Year, Edition, ISBN, Language, Pages
- Write one row per book; leave a cell empty when the value is not visible
- Do NOT invent values that are not shown in the images
- Do NOT use the | character inside a cell

Output ONLY a markdown table with a header row and a separator row, for example:

| Title | Author | ISBN |
| --- | --- | --- |
| Moby Dick | Herman Melville | 9780142437247 |"#;
