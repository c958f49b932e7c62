use crate::document::DocumentKey;
use tokio::time::Instant;

/// Content a request renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Snapshot {
    /// The edit buffer at the time of the request.
    Buffer(String),
    /// Whatever the source store holds when the render starts.
    Source,
}

/// One unit of render work, superseded by any later request of the same key.
#[derive(Debug, Clone)]
pub(crate) struct RenderRequest {
    pub key: DocumentKey,
    pub snapshot: Snapshot,
    pub requested_at: Instant,
    pub generation: u64,
}
