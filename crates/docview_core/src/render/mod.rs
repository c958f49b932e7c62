//! Markdown to HTML rendering with diagram extraction.
//!
//! Rendering runs in two passes:
//!
//! 1. The diagram pass cuts fenced diagram blocks (```` ```mermaid ```` by default)
//!    out of the text and leaves an HTML comment with a placeholder token in
//!    their place.
//! 2. The remaining markdown is parsed with pulldown-cmark, folded into a
//!    document tree and written out by a recursive HTML writer.
//!
//! The result carries the HTML and the extracted blocks. Swapping the
//! placeholders for interactive diagram containers is left to the consumer.

mod diagram;
mod heading;
mod html;
mod markdown_renderer;
mod output;
mod traits;
mod tree;

pub use heading::slugify;
pub use markdown_renderer::{DocumentRenderer, MarkdownRenderer, TabularRenderer};
pub use output::RenderedOutput;
pub use traits::{RenderError, TextRenderer};

use docview_config::{MarkupConfig, RawHtmlPolicy};
use pulldown_cmark::{Options, Parser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Options for rendering markdown to HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Language tag of the fenced blocks extracted as diagrams.
    pub diagram_language: String,
    /// Raw inline/block HTML handling.
    pub raw_html: RawHtmlPolicy,
    /// Enable GitHub Flavored Markdown tables
    pub enable_tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub enable_strikethrough: bool,
    /// Enable task list items ([x] and [ ])
    pub enable_tasklists: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self::from_config(&MarkupConfig::default())
    }
}

impl MarkupOptions {
    pub fn from_config(config: &MarkupConfig) -> Self {
        Self {
            diagram_language: config.diagram_language.clone(),
            raw_html: config.raw_html,
            enable_tables: config.tables,
            enable_strikethrough: config.strikethrough,
            enable_tasklists: config.tasklists,
        }
    }

    fn to_pulldown_options(&self) -> Options {
        let mut options = Options::empty();
        if self.enable_tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.enable_strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.enable_tasklists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options
    }
}

/// A fenced diagram block cut out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialBlock {
    /// Diagram source between the fences.
    pub raw_code: String,
    /// Line of the opening fence (1-indexed).
    pub start_line: usize,
    /// Line of the closing fence (1-indexed).
    pub end_line: usize,
    /// Token unique within the document, see [`SpecialBlock::comment`].
    pub placeholder: String,
}

impl SpecialBlock {
    /// The HTML comment standing in for the block in the rendered HTML.
    pub fn comment(&self) -> String {
        Self::comment_for(&self.placeholder)
    }

    fn comment_for(placeholder: &str) -> String {
        format!("<!-- {placeholder} -->")
    }
}

/// Result of [`render_markup`].
///
/// Every placeholder in `html_content` has exactly one entry in
/// `special_blocks` and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMarkup {
    pub html_content: String,
    pub special_blocks: Vec<SpecialBlock>,
}

/// Render markdown content to HTML.
///
/// # Example
///
/// ```
/// use docview_core::render::{render_markup, MarkupOptions};
///
/// let doc = "# Flow\n\n```mermaid\nA-->B\n```\n";
/// let rendered = render_markup(doc, &MarkupOptions::default()).unwrap();
/// assert!(rendered.html_content.contains("<h1 id=\"flow\">"));
/// assert_eq!(rendered.special_blocks.len(), 1);
/// assert!(rendered.html_content.contains(&rendered.special_blocks[0].comment()));
/// ```
pub fn render_markup(content: &str, options: &MarkupOptions) -> Result<RenderedMarkup, RenderError> {
    let extraction = diagram::extract(content, &options.diagram_language);

    let parser = Parser::new_ext(&extraction.content, options.to_pulldown_options());
    let nodes = tree::build(parser)?;

    let placeholders: HashSet<&str> = extraction
        .blocks
        .iter()
        .map(|block| block.placeholder.as_str())
        .collect();
    let html_content = html::HtmlWriter::new(options, &placeholders).write(&nodes);

    for block in &extraction.blocks {
        let occurrences = html_content.matches(block.placeholder.as_str()).count();
        if occurrences != 1 {
            return Err(RenderError::Malformed(format!(
                "placeholder {} appears {occurrences} times in the output",
                block.placeholder
            )));
        }
    }

    tracing::debug!(
        bytes = content.len(),
        html_bytes = html_content.len(),
        diagrams = extraction.blocks.len(),
        "Rendered markup"
    );

    Ok(RenderedMarkup {
        html_content,
        special_blocks: extraction.blocks,
    })
}
