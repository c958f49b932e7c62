//! The two state machines of the tabular parser.
//!
//! [`Records`] splits the input into records, honouring quoted regions so that
//! a newline inside quotes does not end a record. [`split_fields`] then splits
//! one record into fields.

/// Iterator over the records of delimited text.
///
/// A trailing `\r` is stripped from each record so CRLF input parses like LF
/// input. An unterminated quote extends the last record to the end of input.
pub(crate) struct Records<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Self { content, pos: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.content.len() {
            return None;
        }

        let rest = &self.content[self.pos..];
        let mut in_quotes = false;

        // `"` and `\n` are ASCII, so byte positions are char boundaries.
        for (i, byte) in rest.bytes().enumerate() {
            match byte {
                b'"' => in_quotes = !in_quotes,
                b'\n' if !in_quotes => {
                    self.pos += i + 1;
                    return Some(strip_cr(&rest[..i]));
                }
                _ => {}
            }
        }

        self.pos = self.content.len();
        Some(strip_cr(rest))
    }
}

fn strip_cr(record: &str) -> &str {
    record.strip_suffix('\r').unwrap_or(record)
}

/// Returns `true` if the record holds nothing but whitespace.
///
/// The delimiter never counts as whitespace, a record of tabs in a tab
/// separated document is a row of empty fields.
pub(crate) fn is_blank(record: &str, delimiter: char) -> bool {
    record
        .chars()
        .all(|c| c.is_whitespace() && c != delimiter)
}

/// Counts `delimiter` occurrences outside quoted regions.
pub(crate) fn count_outside_quotes(record: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in record.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Splits one record into cleaned fields.
///
/// Collection stops as soon as `column_limit` fields are gathered, the rest of
/// the record is not scanned.
pub(crate) fn split_fields(
    record: &str,
    delimiter: char,
    column_limit: Option<usize>,
    max_field_len: usize,
) -> Vec<String> {
    let limit = column_limit.unwrap_or(usize::MAX);
    if limit == 0 {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut field = FieldBuf::new(max_field_len);
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            c if c == delimiter && !in_quotes => {
                fields.push(field.finish());
                if fields.len() == limit {
                    return fields;
                }
            }
            c => field.push(c),
        }
    }

    fields.push(field.finish());
    fields
}

/// Accumulates one field as it will be reported, bounding memory to
/// `max_len` characters.
///
/// Leading and trailing whitespace of the raw field is trimmed first, then
/// control characters other than tab/newline/carriage-return are stripped,
/// then the result is capped.
struct FieldBuf {
    buf: String,
    /// Characters in `buf`.
    len: usize,
    max_len: usize,
    /// Set once the first non-whitespace character was seen.
    started: bool,
    /// Whitespace after the last non-whitespace character, dropped if the
    /// field ends here.
    pending: String,
    pending_len: usize,
}

impl FieldBuf {
    fn new(max_len: usize) -> Self {
        Self {
            buf: String::new(),
            len: 0,
            max_len,
            started: false,
            pending: String::new(),
            pending_len: 0,
        }
    }

    fn push(&mut self, c: char) {
        if c.is_whitespace() {
            if self.started && is_kept(c) && self.len + self.pending_len < self.max_len {
                self.pending.push(c);
                self.pending_len += 1;
            }
            return;
        }

        self.started = true;
        self.buf.push_str(&self.pending);
        self.len += self.pending_len;
        self.pending.clear();
        self.pending_len = 0;

        if is_kept(c) && self.len < self.max_len {
            self.buf.push(c);
            self.len += 1;
        }
    }

    fn finish(&mut self) -> String {
        let field = std::mem::take(&mut self.buf);
        self.len = 0;
        self.started = false;
        self.pending.clear();
        self.pending_len = 0;
        field
    }
}

fn is_kept(c: char) -> bool {
    !c.is_control() || matches!(c, '\t' | '\n' | '\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cleans a whole raw field at once.
    fn clean_field(raw: &str, max_len: usize) -> String {
        raw.trim().chars().filter(|c| is_kept(*c)).take(max_len).collect()
    }

    #[test]
    fn test_records_respect_quotes() {
        let records: Vec<_> = Records::new("a,\"multi\nline\"\r\nb,c\n").collect();
        assert_eq!(records, vec!["a,\"multi\nline\"", "b,c"]);
    }

    #[test]
    fn test_records_without_trailing_newline() {
        let records: Vec<_> = Records::new("x\ny").collect();
        assert_eq!(records, vec!["x", "y"]);
        assert_eq!(Records::new("").count(), 0);
    }

    #[test]
    fn test_records_strip_bom() {
        let records: Vec<_> = Records::new("\u{feff}h1,h2\n").collect();
        assert_eq!(records, vec!["h1,h2"]);
    }

    #[test]
    fn test_split_quoted_delimiter() {
        assert_eq!(
            split_fields("a,\"b,c\",d", ',', None, 100),
            vec!["a", "b,c", "d"]
        );
    }

    #[test]
    fn test_split_escaped_quote() {
        assert_eq!(
            split_fields("\"He said \"\"hi\"\"\"", ',', None, 100),
            vec!["He said \"hi\""]
        );
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(
            split_fields("a,\"never closed, really", ',', None, 100),
            vec!["a", "never closed, really"]
        );
    }

    #[test]
    fn test_split_column_limit() {
        assert_eq!(split_fields("1;2;3;4", ';', Some(2), 100), vec!["1", "2"]);
        assert!(split_fields("1;2", ';', Some(0), 100).is_empty());
    }

    #[test]
    fn test_split_delimiter_only_record() {
        assert_eq!(split_fields(",,", ',', None, 100), vec!["", "", ""]);
        assert!(!is_blank("\t\t", '\t'));
        assert!(is_blank(" \t ", ','));
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  a\u{0}b\u{7}\tc  ", 100), "ab\tc");
        assert_eq!(clean_field("abcdef", 3), "abc");
    }

    #[test]
    fn test_field_length_is_bounded() {
        let long = "x".repeat(50_000);
        let fields = split_fields(&format!("{long},y"), ',', None, 10);
        assert_eq!(fields, vec!["x".repeat(10), "y".to_string()]);
    }

    #[test]
    fn test_control_padding_keeps_content() {
        let padded = format!("{}abc", "\u{1}".repeat(20_000));
        assert_eq!(split_fields(&padded, ',', None, 10_000), vec!["abc"]);

        let spaced = format!("a{}b", " ".repeat(20_000));
        let fields = split_fields(&spaced, ',', None, 5);
        assert_eq!(fields, vec!["a    "]);
    }

    #[test]
    fn test_streaming_matches_clean_field() {
        for raw in [
            "  a\u{0}b\u{7}\tc  ",
            " \u{1} x \u{1} ",
            "\u{85}lead\u{85}mid\u{85}",
            "\t\t",
            "",
            "abcdef",
        ] {
            for max_len in [0, 2, 4, 100] {
                assert_eq!(
                    split_fields(raw, ',', None, max_len),
                    vec![clean_field(raw, max_len)],
                    "{raw:?} capped at {max_len}"
                );
            }
        }
    }

    #[test]
    fn test_count_outside_quotes() {
        assert_eq!(count_outside_quotes("a,\"b,c\",d", ','), 2);
        assert_eq!(count_outside_quotes("abc", ','), 0);
    }
}
