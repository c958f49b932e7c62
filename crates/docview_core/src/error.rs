//! Error taxonomy of the content pipeline.

use crate::document::DocumentKey;
use crate::render::RenderError;
use crate::source::SourceError;
use std::time::Duration;

/// Errors surfaced to the presentation layer.
///
/// Parser-level issues with a sane default (unterminated quote, empty file,
/// unmatched fence, ...) never show up here, the parsers recover locally.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document not found: {0}")]
    NotFound(DocumentKey),

    #[error("{key} is not valid UTF-8: {source}")]
    Decode {
        key: DocumentKey,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    RenderFailure(#[from] RenderError),

    #[error("refresh requested too soon, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("{0} changed on disk while it has unsaved edits")]
    ConflictDetected(DocumentKey),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl PipelineError {
    /// Maps a source store error for `key`, keeping `NotFound` distinct.
    pub(crate) fn from_source(key: &DocumentKey, err: SourceError) -> Self {
        match err {
            SourceError::NotFound => Self::NotFound(key.clone()),
            err => Self::Source(err),
        }
    }

    pub(crate) fn from_render(err: RenderError) -> Self {
        match err {
            RenderError::Malformed(reason) => Self::MalformedInput(reason),
            err => Self::RenderFailure(err),
        }
    }

    /// Whether the error is shown to the user as a fallback rendering rather
    /// than propagated.
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            Self::RenderFailure(_)
                | Self::MalformedInput(_)
                | Self::Source(SourceError::Timeout(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_decode() {
        let key = DocumentKey::from("/tmp/missing.csv");
        let err = PipelineError::from_source(&key, SourceError::NotFound);
        assert!(matches!(err, PipelineError::NotFound(ref k) if k == &key));
        assert!(!err.is_render_failure());

        let bytes = [0x66, 0xff, 0x6f];
        let decode = PipelineError::Decode {
            key,
            source: std::str::from_utf8(&bytes).unwrap_err(),
        };
        assert!(decode.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_timeout_is_a_render_failure() {
        let err = PipelineError::from_source(
            &DocumentKey::from("a.md"),
            SourceError::Timeout(Duration::from_millis(10)),
        );
        assert!(err.is_render_failure());
    }
}
