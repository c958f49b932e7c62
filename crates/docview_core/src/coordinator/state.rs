use std::sync::Arc;
use tokio::time::Instant;

/// Render lifecycle of one document.
///
/// `Idle -> Pending -> Rendering -> Idle`, an external change moves any
/// phase back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPhase {
    #[default]
    Idle,
    /// A render is scheduled and waiting out the debounce delay.
    Pending,
    Rendering,
}

#[derive(Debug, Default)]
pub(crate) struct DocumentState {
    pub phase: RenderPhase,
    /// Generation of the latest request, older requests are stale.
    pub generation: u64,
    /// Unsaved content from the editor.
    pub edit_buffer: Option<String>,
    /// Whether the document is opened, i.e. subscribed to change events.
    pub is_open: bool,
    /// Completion time of the last manual refresh.
    pub last_refresh: Option<Instant>,
    /// Set while a manual refresh is running.
    pub refresh_in_flight: bool,
    /// Number of renders committed for this document.
    pub completed_renders: usize,
    /// Serializes the renders of this document.
    pub gate: Arc<tokio::sync::Mutex<()>>,
}

impl DocumentState {
    pub fn has_unsaved_edits(&self) -> bool {
        self.edit_buffer.is_some()
    }
}
