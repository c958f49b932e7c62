//! Renderer traits for different document types.
//!
//! This module defines the [`TextRenderer`] trait that provides a common
//! interface for turning decoded document text into [`RenderedMarkup`].

use super::RenderedMarkup;

/// Error type for rendering operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The document structure could not be recovered.
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// General rendering error, e.g. a panicking render task.
    #[error("Render error: {0}")]
    Other(String),
}

/// Trait for text-based document renderers (markdown, tables).
///
/// Implementations are stateless: rendering the same content twice yields
/// the same output.
pub trait TextRenderer: Send + Sync {
    /// Render UTF-8 text content to HTML.
    fn render_text(&self, content: &str) -> Result<RenderedMarkup, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let malformed = RenderError::Malformed("unclosed Paragraph".to_string());
        assert_eq!(
            malformed.to_string(),
            "Malformed document: unclosed Paragraph"
        );

        let other_err = RenderError::Other("custom error".to_string());
        assert_eq!(other_err.to_string(), "Render error: custom error");
    }
}
