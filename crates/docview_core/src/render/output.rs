//! The rendering handed to the presentation layer.
//!
//! [`RenderedOutput`] is serialized to JSON for transmission to a web
//! front end.

use super::{RenderedMarkup, SpecialBlock};
use serde::{Deserialize, Serialize};

/// Consolidated, displayable rendering of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedOutput {
    /// HTML ready for innerHTML injection.
    pub html: String,
    /// Diagram blocks whose placeholders appear in `html`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_blocks: Vec<SpecialBlock>,
    /// Whether the rendering was served from the cache.
    pub is_from_cache: bool,
    /// Set when rendering failed and `html` holds the raw source instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderedOutput {
    pub fn from_markup(markup: &RenderedMarkup, is_from_cache: bool) -> Self {
        Self {
            html: markup.html_content.clone(),
            special_blocks: markup.special_blocks.clone(),
            is_from_cache,
            error: None,
        }
    }

    /// The raw, un-rendered `source` under an error banner.
    ///
    /// ```
    /// use docview_core::RenderedOutput;
    ///
    /// let output = RenderedOutput::fallback("a < b", "boom");
    /// assert!(output.html.contains("a &lt; b"));
    /// assert_eq!(output.error.as_deref(), Some("boom"));
    /// ```
    pub fn fallback(source: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        let html = format!(
            "<div class=\"docview-error\" role=\"alert\">{}</div>\n<pre class=\"docview-source\">{}</pre>\n",
            html_escape::encode_text(&error),
            html_escape::encode_text(source),
        );
        Self {
            html,
            special_blocks: Vec::new(),
            is_from_cache: false,
            error: Some(error),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_markup() {
        let markup = RenderedMarkup {
            html_content: "<p>test</p>".to_string(),
            special_blocks: Vec::new(),
        };
        let output = RenderedOutput::from_markup(&markup, true);
        assert_eq!(output.html, "<p>test</p>");
        assert!(output.is_from_cache);
        assert!(!output.is_fallback());
    }

    #[test]
    fn test_fallback_escapes_source_and_error() {
        let output = RenderedOutput::fallback("<script>x</script>", "bad <input>");
        assert!(output.html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(output.html.contains("bad &lt;input&gt;"));
        assert!(!output.is_from_cache);
        assert!(output.is_fallback());
    }

    #[test]
    fn test_serde_skips_empty_fields() {
        let output = RenderedOutput::from_markup(
            &RenderedMarkup {
                html_content: "<p>test</p>".to_string(),
                special_blocks: Vec::new(),
            },
            false,
        );
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"html":"<p>test</p>","is_from_cache":false}"#);
    }

    #[test]
    fn test_serde_with_blocks() {
        let output = RenderedOutput {
            html: "<!-- docview:diagram[0] -->".to_string(),
            special_blocks: vec![SpecialBlock {
                raw_code: "A-->B".to_string(),
                start_line: 1,
                end_line: 3,
                placeholder: "docview:diagram[0]".to_string(),
            }],
            is_from_cache: false,
            error: None,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains(r#""placeholder":"docview:diagram[0]""#));
        let back: RenderedOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }
}
