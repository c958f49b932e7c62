use super::TabularData;
use std::fmt::Write;

impl TabularData {
    /// Renders the table as HTML.
    ///
    /// Rows shorter than the widest row are padded with empty cells. All cell
    /// text is escaped.
    pub fn to_html(&self) -> String {
        let width = self.column_count();
        let mut html = String::from("<table class=\"docview-table\">\n");

        if !self.headers.is_empty() {
            html.push_str("<thead>\n<tr>");
            push_cells(&mut html, "th", &self.headers, width);
            html.push_str("</tr>\n</thead>\n");
        }

        html.push_str("<tbody>\n");
        for row in &self.rows {
            html.push_str("<tr>");
            push_cells(&mut html, "td", row, width);
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");

        html
    }

    /// Serializes the table back to delimited text.
    ///
    /// Fields holding the delimiter, a quote, a line break or surrounding
    /// whitespace are quoted.
    pub fn to_delimited(&self) -> String {
        let separator = self.delimiter.as_char();
        let mut out = String::new();

        for record in std::iter::once(&self.headers)
            .filter(|headers| !headers.is_empty())
            .chain(self.rows.iter())
        {
            for (i, field) in record.iter().enumerate() {
                if i > 0 {
                    out.push(separator);
                }
                push_field(&mut out, field, separator);
            }
            out.push('\n');
        }

        out
    }
}

fn push_cells(html: &mut String, tag: &str, cells: &[String], width: usize) {
    for i in 0..width {
        let text = cells.get(i).map(String::as_str).unwrap_or_default();
        let _ = write!(html, "<{tag}>{}</{tag}>", html_escape::encode_text(text));
    }
}

fn push_field(out: &mut String, field: &str, separator: char) {
    let needs_quotes = field.contains(separator)
        || field.contains(['"', '\n', '\r'])
        || field.trim() != field;

    if needs_quotes {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
