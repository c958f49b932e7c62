//! Core of the docview content pipeline.
//!
//! Turns document sources into displayable HTML and keeps the rendering of
//! the open documents in sync with edits and external changes.
//!
//! # Modules
//!
//! - [`tabular`] - CSV/TSV parsing with delimiter inference
//! - [`render`] - Markdown to HTML conversion with diagram block extraction
//! - [`cache`] - Render cache with TTL, fingerprints and eviction
//! - [`coordinator`] - Debounced, cancellable rendering of open documents
//! - [`source`] - Access to the persisted document content
//! - [`watcher`] - Change notifications of the persisted documents

pub mod cache;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod render;
pub mod source;
pub mod tabular;
pub mod watcher;

// Re-export commonly used types at crate root
pub use coordinator::{CoordinatorEvent, RenderCoordinator, RenderPhase};
pub use document::{DocumentKey, DocumentType};
pub use error::PipelineError;
pub use render::{render_markup, MarkupOptions, RenderedMarkup, RenderedOutput, SpecialBlock};
pub use source::{FsSourceStore, SourceError, SourceStore};
pub use tabular::{Delimiter, TabularData, TabularOptions};
pub use watcher::{ChangeEvent, ChangeKind, ChangeNotifier, FsChangeNotifier};
