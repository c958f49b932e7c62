//! Parser for delimited tabular text (CSV, TSV and semicolon separated).
//!
//! The parser never fails on malformed text: an unterminated quote is closed
//! at the end of input, blank records are skipped and ragged rows are kept as
//! they are. Only undecodable bytes are reported, see [`parse_bytes`].

mod delimiter;
mod format;
mod scan;

pub use delimiter::{infer_delimiter, Delimiter};

use scan::{is_blank, split_fields, Records};
use serde::{Deserialize, Serialize};

/// Default cap of a single field, in characters.
pub const DEFAULT_MAX_FIELD_LEN: usize = 10_000;

/// Options of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularOptions {
    /// Pinned delimiter, inferred from the content when `None`.
    pub delimiter: Option<Delimiter>,
    /// Maximum number of data rows, the header row excluded.
    pub row_limit: Option<usize>,
    /// Maximum number of fields collected per record.
    pub column_limit: Option<usize>,
    /// Fields are truncated to this many characters.
    pub max_field_len: usize,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            row_limit: None,
            column_limit: None,
            max_field_len: DEFAULT_MAX_FIELD_LEN,
        }
    }
}

impl TabularOptions {
    pub fn from_config(config: &docview_config::PipelineConfig) -> Self {
        Self {
            delimiter: None,
            row_limit: config.csv_row_limit,
            column_limit: config.csv_column_limit,
            max_field_len: config.max_field_length,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

/// Parsed table.
///
/// A row may hold fewer fields than `headers` (the missing ones render as
/// empty cells) or more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularData {
    pub delimiter: Delimiter,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularData {
    /// Number of columns, the widest of the header and all rows.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Parses delimited `content`.
///
/// The first non-blank record becomes the headers, the following non-blank
/// records become rows.
///
/// ```
/// use docview_core::tabular::{parse, TabularOptions};
///
/// let table = parse("name,qty\napple,\"1,5\"\n", &TabularOptions::default());
/// assert_eq!(table.headers, vec!["name", "qty"]);
/// assert_eq!(table.rows, vec![vec!["apple", "1,5"]]);
/// ```
pub fn parse(content: &str, options: &TabularOptions) -> TabularData {
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| infer_delimiter(content));
    let separator = delimiter.as_char();

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in Records::new(content) {
        if is_blank(record, separator) {
            continue;
        }

        if headers.is_some() && options.row_limit.is_some_and(|limit| rows.len() >= limit) {
            tracing::debug!(row_limit = ?options.row_limit, "Row limit reached");
            break;
        }

        let fields = split_fields(
            record,
            separator,
            options.column_limit,
            options.max_field_len,
        );

        match headers {
            None => headers = Some(fields),
            Some(_) => rows.push(fields),
        }
    }

    TabularData {
        delimiter,
        headers: headers.unwrap_or_default(),
        rows,
    }
}

/// Decodes `bytes` as UTF-8 and parses them.
pub fn parse_bytes(
    bytes: &[u8],
    options: &TabularOptions,
) -> Result<TabularData, std::str::Utf8Error> {
    std::str::from_utf8(bytes).map(|content| parse(content, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(content: &str) -> TabularData {
        parse(content, &TabularOptions::default())
    }

    #[test]
    fn test_quote_handling() {
        let table = parse_default("h1,h2,h3\na,\"b,c\",d\n");
        assert_eq!(table.rows, vec![vec!["a", "b,c", "d"]]);
    }

    #[test]
    fn test_escaped_quote() {
        let table = parse(
            "\"He said \"\"hi\"\"\"",
            &TabularOptions::default().with_delimiter(Delimiter::Comma),
        );
        assert_eq!(table.headers, vec!["He said \"hi\""]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_inferred_semicolon() {
        let table = parse_default("a;b;c\n1;2;3");
        assert_eq!(table.delimiter, Delimiter::Semicolon);
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows, vec![vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_embedded_newline() {
        let table = parse_default("title,body\nx,\"line one\nline two\"\n");
        assert_eq!(table.rows, vec![vec!["x", "line one\nline two"]]);
    }

    #[test]
    fn test_blank_and_delimiter_only_rows() {
        let table = parse_default("a,b\n\n   \n,\n1,2\n");
        assert_eq!(table.rows, vec![vec!["", ""], vec!["1", "2"]]);
    }

    #[test]
    fn test_short_and_long_rows_are_kept() {
        let table = parse_default("a,b,c\n1\n1,2,3,4\n");
        assert_eq!(table.rows, vec![vec!["1"], vec!["1", "2", "3", "4"]]);
        assert_eq!(table.column_count(), 4);
    }

    #[test]
    fn test_row_limit() {
        let options = TabularOptions {
            row_limit: Some(2),
            ..Default::default()
        };
        let table = parse("h\n1\n2\n3\n4\n", &options);
        assert_eq!(table.headers, vec!["h"]);
        assert_eq!(table.rows, vec![vec!["1"], vec!["2"]]);
    }

    #[test]
    fn test_column_limit() {
        let options = TabularOptions {
            column_limit: Some(2),
            ..Default::default()
        };
        let table = parse("a,b,c\n1,2,3\n", &options);
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_unterminated_quote_does_not_crash() {
        let table = parse_default("a,b\n1,\"open\n2,3\n");
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "open\n2,3"]]);
    }

    #[test]
    fn test_empty_input() {
        let table = parse_default("");
        assert!(table.is_empty());
        assert_eq!(table.delimiter, Delimiter::Comma);
        assert!(parse_default("\n\n").is_empty());
    }

    #[test]
    fn test_idempotent() {
        let content = "x;y\n\"1;\"\"2\";3\n;\n";
        assert_eq!(parse_default(content), parse_default(content));
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        assert!(parse_bytes(&[b'a', 0xff, b'\n'], &TabularOptions::default()).is_err());
        let table = parse_bytes(b"a\tb\n1\t2\n", &TabularOptions::default()).unwrap();
        assert_eq!(table.delimiter, Delimiter::Tab);
    }

    #[test]
    fn test_options_from_config() {
        let config = docview_config::PipelineConfig {
            csv_row_limit: Some(10),
            csv_column_limit: Some(3),
            ..Default::default()
        };
        let options = TabularOptions::from_config(&config);
        assert_eq!(options.row_limit, Some(10));
        assert_eq!(options.column_limit, Some(3));
        assert_eq!(options.max_field_len, DEFAULT_MAX_FIELD_LEN);
        assert_eq!(options.delimiter, None);
    }
}
