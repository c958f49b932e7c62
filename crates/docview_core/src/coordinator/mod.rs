//! Render coordination of the open documents.
//!
//! [`RenderCoordinator`] receives edits, saves, manual refreshes and external
//! change notifications, and decides when a document is (re-)rendered. It
//! owns the [`RenderCache`] and answers from it whenever the cached rendering
//! matches the current source snapshot.
//!
//! Every request takes a fresh generation for its document. A request only
//! commits its result when its generation is still the latest one, so a
//! superseded render is discarded and per-document results are observed in
//! request order. Debouncing falls out of the same mechanism: a scheduled
//! render that wakes up to find a newer generation does nothing.

mod request;
mod state;

pub use self::state::RenderPhase;

use self::request::{RenderRequest, Snapshot};
use self::state::DocumentState;
use crate::cache::{Fingerprint, RenderCache};
use crate::document::DocumentKey;
use crate::error::PipelineError;
use crate::render::{DocumentRenderer, RenderError, RenderedMarkup, RenderedOutput};
use crate::source::SourceStore;
use crate::watcher::{ChangeEvent, ChangeKind, ChangeNotifier};
use docview_config::Config;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Notifications delivered on the coordinator's output channel.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// A background render completed.
    Rendered {
        key: DocumentKey,
        output: RenderedOutput,
    },
    /// The source changed while the document has unsaved edits, nothing was
    /// reloaded.
    Conflict { key: DocumentKey, kind: ChangeKind },
    /// The source was removed or renamed away.
    SourceRemoved { key: DocumentKey },
    /// A background render could not produce any output, e.g. the source is
    /// not valid UTF-8 or could not be read.
    Failed {
        key: DocumentKey,
        error: Arc<PipelineError>,
    },
}

enum Produced {
    Hit(Arc<RenderedMarkup>),
    Fresh {
        markup: Arc<RenderedMarkup>,
        fingerprint: Fingerprint,
    },
    Failed {
        content: String,
        error: PipelineError,
    },
}

struct Inner {
    store: Arc<dyn SourceStore>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    renderer: Arc<DocumentRenderer>,
    /// Lock order: `documents` before `cache`.
    documents: Mutex<HashMap<DocumentKey, DocumentState>>,
    cache: Mutex<RenderCache>,
    next_generation: AtomicU64,
    event_tx: UnboundedSender<CoordinatorEvent>,
    debounce: Duration,
    refresh_min_interval: Duration,
}

impl Inner {
    fn emit(&self, event: CoordinatorEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Coordinator event receiver dropped");
        }
    }

    /// Starts a new request for `state`, superseding all earlier ones.
    fn begin(&self, key: &DocumentKey, state: &mut DocumentState, snapshot: Snapshot) -> RenderRequest {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        state.generation = generation;
        state.phase = RenderPhase::Pending;
        RenderRequest {
            key: key.clone(),
            snapshot,
            requested_at: Instant::now(),
            generation,
        }
    }

    fn begin_with(
        &self,
        key: &DocumentKey,
        snapshot: impl FnOnce(&mut DocumentState) -> Snapshot,
    ) -> RenderRequest {
        let mut documents = self.documents.lock();
        let state = documents.entry(key.clone()).or_default();
        let snapshot = snapshot(state);
        self.begin(key, state, snapshot)
    }

    fn is_current(&self, key: &DocumentKey, generation: u64) -> bool {
        self.documents
            .lock()
            .get(key)
            .is_some_and(|state| state.generation == generation)
    }

    fn gate(&self, key: &DocumentKey) -> Arc<tokio::sync::Mutex<()>> {
        self.documents
            .lock()
            .get(key)
            .map(|state| state.gate.clone())
            .unwrap_or_default()
    }

    fn set_phase(&self, key: &DocumentKey, generation: u64, phase: RenderPhase) {
        if let Some(state) = self
            .documents
            .lock()
            .get_mut(key)
            .filter(|state| state.generation == generation)
        {
            state.phase = phase;
        }
    }

    /// Renders `request` right away and returns the output to the caller.
    async fn render_now(&self, request: RenderRequest) -> Result<RenderedOutput, PipelineError> {
        let gate = self.gate(&request.key);
        let _guard = gate.lock().await;
        self.render_locked(request).await.map(|(output, _)| output)
    }

    /// Waits out the debounce delay, then renders `request` unless a newer
    /// request came in meanwhile.
    async fn render_debounced(&self, request: RenderRequest) {
        tokio::time::sleep_until(request.requested_at + self.debounce).await;

        let key = request.key.clone();
        let generation = request.generation;

        if !self.is_current(&key, generation) {
            tracing::trace!(%key, generation, "Request superseded before rendering");
            return;
        }

        let gate = self.gate(&key);
        let _guard = gate.lock().await;

        if !self.is_current(&key, generation) {
            tracing::trace!(%key, generation, "Request superseded while waiting for the render gate");
            return;
        }

        match self.render_locked(request).await {
            Ok((output, true)) => self.emit(CoordinatorEvent::Rendered { key, output }),
            Ok((_, false)) => {}
            Err(PipelineError::NotFound(key)) => {
                tracing::debug!(%key, "Source vanished before the scheduled render");
                self.emit(CoordinatorEvent::SourceRemoved { key });
            }
            Err(error) => {
                tracing::error!(%key, ?error, "Background render failed");
                self.emit(CoordinatorEvent::Failed {
                    key,
                    error: Arc::new(error),
                });
            }
        }
    }

    /// Renders with the render gate of the document held.
    ///
    /// Returns the output and whether it was committed.
    async fn render_locked(
        &self,
        request: RenderRequest,
    ) -> Result<(RenderedOutput, bool), PipelineError> {
        let RenderRequest {
            key,
            snapshot,
            requested_at,
            generation,
        } = request;

        self.set_phase(&key, generation, RenderPhase::Rendering);

        let produced = match self.produce(&key, snapshot).await {
            Ok(produced) => produced,
            // Nothing was read, there is no source to show.
            Err(error) if error.is_render_failure() => Produced::Failed {
                content: String::new(),
                error,
            },
            Err(error) => {
                self.set_phase(&key, generation, RenderPhase::Idle);
                return Err(error);
            }
        };

        let (output, cacheable) = match produced {
            Produced::Hit(markup) => (RenderedOutput::from_markup(&markup, true), None),
            Produced::Fresh {
                markup,
                fingerprint,
            } => (
                RenderedOutput::from_markup(&markup, false),
                Some((markup, fingerprint)),
            ),
            Produced::Failed { content, error } => {
                tracing::warn!(%key, %error, "Render failed, falling back to the raw source");
                (RenderedOutput::fallback(&content, error.to_string()), None)
            }
        };

        let committed = self.commit(&key, generation, cacheable);
        if committed {
            tracing::debug!(
                %key,
                generation,
                from_cache = output.is_from_cache,
                latency = ?requested_at.elapsed(),
                "Render committed"
            );
        } else {
            tracing::debug!(%key, generation, "Discarded stale render");
        }

        Ok((output, committed))
    }

    async fn produce(&self, key: &DocumentKey, snapshot: Snapshot) -> Result<Produced, PipelineError> {
        let (fingerprint, buffer) = match snapshot {
            Snapshot::Buffer(text) => (Fingerprint::of_content(&text), Some(text)),
            Snapshot::Source => {
                let modified = self
                    .store
                    .last_modified(key)
                    .await
                    .map_err(|err| PipelineError::from_source(key, err))?;
                (Fingerprint::Modified(modified), None)
            }
        };

        {
            let mut cache = self.cache.lock();
            if cache.invalidate_if_stale(key, &fingerprint) {
                tracing::debug!(%key, "Dropped stale cache entry");
            }
            if let Some(entry) = cache.get(key) {
                tracing::debug!(%key, "Cache hit");
                return Ok(Produced::Hit(entry.payload));
            }
        }

        let content = match buffer {
            Some(text) => text,
            None => {
                let bytes = self
                    .store
                    .read_content(key)
                    .await
                    .map_err(|err| PipelineError::from_source(key, err))?;
                String::from_utf8(bytes).map_err(|err| PipelineError::Decode {
                    key: key.clone(),
                    source: err.utf8_error(),
                })?
            }
        };

        tracing::debug!(%key, bytes = content.len(), "Cache miss, rendering");

        let content: Arc<str> = Arc::from(content);
        let renderer = self.renderer.clone();
        let document_type = key.document_type();
        let result = tokio::task::spawn_blocking({
            let content = content.clone();
            move || renderer.render(document_type, &content)
        })
        .await
        .unwrap_or_else(|err| Err(RenderError::Other(format!("render task failed: {err}"))));

        Ok(match result {
            Ok(markup) => Produced::Fresh {
                markup: Arc::new(markup),
                fingerprint,
            },
            Err(err) => Produced::Failed {
                content: content.to_string(),
                error: PipelineError::from_render(err),
            },
        })
    }

    /// Publishes a finished render if `generation` is still the latest
    /// request of `key`.
    fn commit(
        &self,
        key: &DocumentKey,
        generation: u64,
        cacheable: Option<(Arc<RenderedMarkup>, Fingerprint)>,
    ) -> bool {
        let mut documents = self.documents.lock();
        let Some(state) = documents
            .get_mut(key)
            .filter(|state| state.generation == generation)
        else {
            return false;
        };

        state.phase = RenderPhase::Idle;
        state.completed_renders += 1;

        if let Some((markup, fingerprint)) = cacheable {
            self.cache.lock().put(key.clone(), markup, fingerprint);
        }

        true
    }
}

/// Handle to the render pipeline, cheap to clone.
///
/// The background work is run on the tokio runtime, all methods must be
/// called from within one.
#[derive(Clone)]
pub struct RenderCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RenderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCoordinator")
            .field("documents", &self.inner.documents.lock().len())
            .field("cached", &self.inner.cache.lock().len())
            .finish()
    }
}

impl RenderCoordinator {
    /// Creates a coordinator and the receiver of its [`CoordinatorEvent`]s.
    pub fn new(
        store: Arc<dyn SourceStore>,
        config: &Config,
        notifier: Option<Arc<dyn ChangeNotifier>>,
    ) -> (Self, UnboundedReceiver<CoordinatorEvent>) {
        Self::with_renderer(store, config, notifier, DocumentRenderer::from_config(config))
    }

    /// Same as [`Self::new`], rendering with `renderer` instead of the
    /// renderers configured in `config`.
    pub fn with_renderer(
        store: Arc<dyn SourceStore>,
        config: &Config,
        notifier: Option<Arc<dyn ChangeNotifier>>,
        renderer: DocumentRenderer,
    ) -> (Self, UnboundedReceiver<CoordinatorEvent>) {
        let (event_tx, event_rx) = unbounded_channel();

        let inner = Inner {
            store,
            notifier,
            renderer: Arc::new(renderer),
            documents: Mutex::new(HashMap::new()),
            cache: Mutex::new(RenderCache::from_config(&config.pipeline)),
            next_generation: AtomicU64::new(0),
            event_tx,
            debounce: config.pipeline.debounce(),
            refresh_min_interval: config.pipeline.refresh_min_interval(),
        };

        (
            Self {
                inner: Arc::new(inner),
            },
            event_rx,
        )
    }

    /// Starts tracking `key`, external changes of it are handled from now on.
    pub fn open(&self, key: &DocumentKey) {
        let newly_opened = {
            let mut documents = self.inner.documents.lock();
            let state = documents.entry(key.clone()).or_default();
            !std::mem::replace(&mut state.is_open, true)
        };

        if newly_opened {
            tracing::debug!(%key, "Opened document");
            if let Some(notifier) = &self.inner.notifier {
                notifier.subscribe(key);
            }
        }
    }

    /// Stops tracking `key`, dropping its pending work, edits and cache entry.
    ///
    /// The whole cache is emptied once no document is left.
    pub fn close(&self, key: &DocumentKey) {
        let (removed, none_left) = {
            let mut documents = self.inner.documents.lock();
            let removed = documents.remove(key);
            (removed, documents.is_empty())
        };

        {
            let mut cache = self.inner.cache.lock();
            if none_left {
                cache.clear();
            } else {
                cache.invalidate(key);
            }
        }

        if let Some(state) = removed {
            tracing::debug!(%key, unsaved = state.has_unsaved_edits(), "Closed document");
            if state.is_open {
                if let Some(notifier) = &self.inner.notifier {
                    notifier.unsubscribe(key);
                }
            }
        }
    }

    /// Returns the rendering of the current content of `key`.
    ///
    /// The current content is the edit buffer if there are unsaved edits,
    /// the persisted source otherwise.
    pub async fn load_document(&self, key: &DocumentKey) -> Result<RenderedOutput, PipelineError> {
        let request = self.inner.begin_with(key, current_snapshot);
        self.inner.render_now(request).await
    }

    /// Replaces the edit buffer of `key` and schedules a debounced render.
    ///
    /// The result is delivered as [`CoordinatorEvent::Rendered`], unless a
    /// newer request supersedes it first.
    pub fn update_content(&self, key: &DocumentKey, content: impl Into<String>) {
        let content = content.into();
        let request = self.inner.begin_with(key, |state| {
            state.edit_buffer = Some(content.clone());
            Snapshot::Buffer(content)
        });
        self.schedule(request);
    }

    /// Writes the edit buffer of `key` to the source store and re-renders.
    ///
    /// Without unsaved edits this just re-renders from the source.
    pub async fn save(&self, key: &DocumentKey) -> Result<RenderedOutput, PipelineError> {
        let buffer = self
            .inner
            .documents
            .lock()
            .get_mut(key)
            .and_then(|state| state.edit_buffer.take());

        if let Some(content) = buffer {
            if let Err(err) = self.inner.store.write_content(key, content.as_bytes()).await {
                tracing::error!(%key, ?err, "Failed to save document");
                if let Some(state) = self.inner.documents.lock().get_mut(key) {
                    state.edit_buffer.get_or_insert(content);
                }
                return Err(PipelineError::from_source(key, err));
            }
            tracing::info!(%key, bytes = content.len(), "Saved document");
        }

        self.inner.cache.lock().invalidate(key);
        let request = self.inner.begin_with(key, current_snapshot);
        self.inner.render_now(request).await
    }

    /// Reloads `key` from the source store, discarding unsaved edits.
    ///
    /// Fails with [`PipelineError::RateLimited`] while another refresh of
    /// `key` is running, or within the minimum refresh interval after the
    /// previous refresh completed.
    pub async fn refresh(&self, key: &DocumentKey) -> Result<RenderedOutput, PipelineError> {
        let request = {
            let mut documents = self.inner.documents.lock();
            let state = documents.entry(key.clone()).or_default();

            let retry_after = if state.refresh_in_flight {
                Some(self.inner.refresh_min_interval)
            } else {
                state.last_refresh.and_then(|last_refresh| {
                    self.inner
                        .refresh_min_interval
                        .checked_sub(last_refresh.elapsed())
                        .filter(|remaining| !remaining.is_zero())
                })
            };

            if let Some(retry_after) = retry_after {
                tracing::debug!(%key, ?retry_after, "Refresh rate limited");
                return Err(PipelineError::RateLimited { retry_after });
            }

            state.refresh_in_flight = true;
            if state.edit_buffer.take().is_some() {
                tracing::debug!(%key, "Discarding unsaved edits on refresh");
            }
            self.inner.begin(key, state, Snapshot::Source)
        };

        let _refreshing = RefreshGuard {
            inner: &self.inner,
            key,
        };

        self.inner.cache.lock().invalidate(key);
        self.inner.render_now(request).await
    }

    /// Applies an external change of a document's source.
    ///
    /// Changes of documents that are not open are ignored. A document with
    /// unsaved edits is left alone, a [`CoordinatorEvent::Conflict`] is
    /// emitted and [`PipelineError::ConflictDetected`] returned instead.
    pub fn handle_change(&self, event: ChangeEvent) -> Result<(), PipelineError> {
        let ChangeEvent { key, kind } = event;

        let maybe_request = {
            let mut documents = self.inner.documents.lock();
            let Some(state) = documents.get_mut(&key).filter(|state| state.is_open) else {
                tracing::trace!(%key, ?kind, "Ignoring change of a document not opened");
                return Ok(());
            };

            if state.has_unsaved_edits() {
                drop(documents);
                tracing::warn!(%key, ?kind, "Source changed while the document has unsaved edits");
                self.inner.emit(CoordinatorEvent::Conflict {
                    key: key.clone(),
                    kind,
                });
                return Err(PipelineError::ConflictDetected(key));
            }

            match kind {
                ChangeKind::Created | ChangeKind::Modified => {
                    Some(self.inner.begin(&key, state, Snapshot::Source))
                }
                ChangeKind::Removed | ChangeKind::Renamed => {
                    // Supersede whatever is pending.
                    self.inner.begin(&key, state, Snapshot::Source);
                    state.phase = RenderPhase::Idle;
                    None
                }
            }
        };

        self.inner.cache.lock().invalidate(&key);

        match maybe_request {
            Some(request) => {
                tracing::debug!(%key, ?kind, "Source changed, scheduling reload");
                self.schedule(request);
            }
            None => {
                tracing::debug!(%key, ?kind, "Source removed");
                self.inner.emit(CoordinatorEvent::SourceRemoved { key });
            }
        }

        Ok(())
    }

    /// Feeds the change events received on `changes` into
    /// [`Self::handle_change`] until the channel closes.
    pub fn spawn_change_listener(
        &self,
        mut changes: UnboundedReceiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            while let Some(event) = changes.recv().await {
                if let Err(err) = coordinator.handle_change(event) {
                    tracing::debug!(%err, "Change event not applied");
                }
            }
            tracing::debug!("Change listener exited");
        })
    }

    fn schedule(&self, request: RenderRequest) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.render_debounced(request).await;
        });
    }

    pub fn phase(&self, key: &DocumentKey) -> Option<RenderPhase> {
        self.inner.documents.lock().get(key).map(|state| state.phase)
    }

    pub fn has_unsaved_edits(&self, key: &DocumentKey) -> bool {
        self.inner
            .documents
            .lock()
            .get(key)
            .is_some_and(DocumentState::has_unsaved_edits)
    }

    /// Number of renders committed for `key`, cache hits included.
    pub fn completed_renders(&self, key: &DocumentKey) -> usize {
        self.inner
            .documents
            .lock()
            .get(key)
            .map_or(0, |state| state.completed_renders)
    }

    pub fn cached_documents(&self) -> usize {
        self.inner.cache.lock().len()
    }
}

/// Marks the end of a refresh, also when the refresh future is dropped.
struct RefreshGuard<'a> {
    inner: &'a Inner,
    key: &'a DocumentKey,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.inner.documents.lock().get_mut(self.key) {
            state.refresh_in_flight = false;
            state.last_refresh.replace(Instant::now());
        }
    }
}

fn current_snapshot(state: &mut DocumentState) -> Snapshot {
    match &state.edit_buffer {
        Some(text) => Snapshot::Buffer(text.clone()),
        None => Snapshot::Source,
    }
}
