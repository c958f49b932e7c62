//! First rendering pass: diagram extraction.
//!
//! Diagram sources are not markdown. Each fenced diagram block is cut out of
//! the text before the markdown parser sees it and replaced with an HTML
//! comment holding a placeholder token, so the diagram syntax can not disturb
//! the surrounding document structure.

use super::SpecialBlock;

const FENCE: &str = "```";

/// Base of the placeholder tokens.
///
/// `:` and `[]` are dropped by the heading slugifier, so generated heading IDs
/// never collide with a token.
const TOKEN_BASE: &str = "docview:diagram";

/// Text with diagrams replaced by placeholders.
#[derive(Debug)]
pub(crate) struct Extraction {
    pub content: String,
    pub blocks: Vec<SpecialBlock>,
}

/// Cuts the ```` ```{language} ```` blocks out of `content`.
///
/// A block opens on a line whose trimmed content is the fence followed by the
/// language tag, and closes on a line whose trimmed content is exactly the
/// fence. An opening fence without a closing one is left in place.
pub(crate) fn extract(content: &str, language: &str) -> Extraction {
    let prefix = token_prefix(content);
    let lines: Vec<&str> = content.split_inclusive('\n').collect();

    let mut out = String::with_capacity(content.len());
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if is_opening_fence(line, language) {
            let Some(close) = (i + 1..lines.len()).find(|&j| lines[j].trim() == FENCE) else {
                // Nothing further down can close a block.
                tracing::debug!(line = i + 1, "Unterminated diagram fence");
                lines[i..].iter().for_each(|rest| out.push_str(rest));
                break;
            };

            let placeholder = format!("{prefix}[{}]", blocks.len());
            let indent = &line[..line.len() - line.trim_start().len()];
            out.push_str(indent);
            out.push_str(&SpecialBlock::comment_for(&placeholder));
            if lines[close].ends_with('\n') {
                out.push('\n');
            }

            blocks.push(SpecialBlock {
                raw_code: lines[i + 1..close]
                    .iter()
                    .map(|l| l.trim_end_matches(['\n', '\r']))
                    .collect::<Vec<_>>()
                    .join("\n"),
                start_line: i + 1,
                end_line: close + 1,
                placeholder,
            });

            i = close + 1;
            continue;
        }

        out.push_str(line);
        i += 1;
    }

    Extraction {
        content: out,
        blocks,
    }
}

fn is_opening_fence(line: &str, language: &str) -> bool {
    line.trim()
        .strip_prefix(FENCE)
        .and_then(|rest| rest.strip_prefix(language))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Returns a token prefix that does not occur anywhere in `content`.
fn token_prefix(content: &str) -> String {
    let mut prefix = TOKEN_BASE.to_string();
    let mut salt = 0usize;
    while content.contains(&prefix) {
        salt += 1;
        prefix = format!("{TOKEN_BASE}{salt}");
    }
    prefix
}
