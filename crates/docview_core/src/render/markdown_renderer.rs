//! Concrete [`TextRenderer`]s and the per-type dispatch.

use super::traits::{RenderError, TextRenderer};
use super::{render_markup, MarkupOptions, RenderedMarkup};
use crate::document::DocumentType;
use crate::tabular::{self, Delimiter, TabularOptions};
use std::sync::Arc;

/// Markdown document renderer.
///
/// Converts markdown to HTML, extracting the diagram blocks.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: MarkupOptions,
}

impl MarkdownRenderer {
    pub fn new(options: MarkupOptions) -> Self {
        Self { options }
    }
}

impl TextRenderer for MarkdownRenderer {
    fn render_text(&self, content: &str) -> Result<RenderedMarkup, RenderError> {
        render_markup(content, &self.options)
    }
}

/// Delimited text renderer, produces an HTML table.
#[derive(Debug, Clone, Default)]
pub struct TabularRenderer {
    options: TabularOptions,
}

impl TabularRenderer {
    pub fn new(options: TabularOptions) -> Self {
        Self { options }
    }
}

impl TextRenderer for TabularRenderer {
    fn render_text(&self, content: &str) -> Result<RenderedMarkup, RenderError> {
        let table = tabular::parse(content, &self.options);
        tracing::debug!(
            delimiter = ?table.delimiter,
            columns = table.headers.len(),
            rows = table.rows.len(),
            "Parsed table"
        );
        Ok(RenderedMarkup {
            html_content: table.to_html(),
            special_blocks: Vec::new(),
        })
    }
}

/// Routes a document to the renderer of its [`DocumentType`].
#[derive(Clone)]
pub struct DocumentRenderer {
    markdown: Arc<dyn TextRenderer>,
    csv: Arc<dyn TextRenderer>,
    tsv: Arc<dyn TextRenderer>,
}

impl std::fmt::Debug for DocumentRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRenderer").finish_non_exhaustive()
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(MarkupOptions::default(), TabularOptions::default())
    }
}

impl DocumentRenderer {
    pub fn new(markup: MarkupOptions, tabular: TabularOptions) -> Self {
        Self {
            markdown: Arc::new(MarkdownRenderer::new(markup)),
            tsv: Arc::new(TabularRenderer::new(
                tabular.clone().with_delimiter(Delimiter::Tab),
            )),
            csv: Arc::new(TabularRenderer::new(tabular)),
        }
    }

    pub fn from_config(config: &docview_config::Config) -> Self {
        Self::new(
            MarkupOptions::from_config(&config.markup),
            TabularOptions::from_config(&config.pipeline),
        )
    }

    /// Replaces the renderer used for `document_type`.
    pub fn with_renderer(
        mut self,
        document_type: DocumentType,
        renderer: impl TextRenderer + 'static,
    ) -> Self {
        let renderer: Arc<dyn TextRenderer> = Arc::new(renderer);
        match document_type {
            DocumentType::Markdown => self.markdown = renderer,
            DocumentType::Csv => self.csv = renderer,
            DocumentType::Tsv => self.tsv = renderer,
        }
        self
    }

    pub fn renderer_for(&self, document_type: DocumentType) -> &dyn TextRenderer {
        match document_type {
            DocumentType::Markdown => self.markdown.as_ref(),
            DocumentType::Csv => self.csv.as_ref(),
            DocumentType::Tsv => self.tsv.as_ref(),
        }
    }

    pub fn render(
        &self,
        document_type: DocumentType,
        content: &str,
    ) -> Result<RenderedMarkup, RenderError> {
        self.renderer_for(document_type).render_text(content)
    }
}
