//! Change notifications of the persisted documents.
//!
//! The coordinator only sees the [`ChangeNotifier`] trait plus a channel of
//! [`ChangeEvent`]s, [`FsChangeNotifier`] feeds that channel from `notify`.

use crate::document::DocumentKey;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// A change of one document on its persisted storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: DocumentKey,
    pub kind: ChangeKind,
}

/// Registers interest in the changes of individual documents.
///
/// Events of subscribed documents are delivered through the channel the
/// implementation was constructed with.
pub trait ChangeNotifier: Send + Sync {
    fn subscribe(&self, key: &DocumentKey);

    fn unsubscribe(&self, key: &DocumentKey);
}

/// Maps a `notify` event kind to the change of the path at `position` in the
/// event's path list.
///
/// Write-rename saves show up as a rename *to* the document, which counts as
/// a new version of it.
fn classify(kind: &EventKind, position: usize) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => Some(ChangeKind::Created),
            RenameMode::Both if position > 0 => Some(ChangeKind::Created),
            _ => Some(ChangeKind::Renamed),
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

struct WatchState {
    watcher: RecommendedWatcher,
    /// Watched parent directory => number of subscribed documents in it.
    watched_dirs: HashMap<PathBuf, usize>,
}

/// [`ChangeNotifier`] backed by the native filesystem watcher.
///
/// The parent directory of each document is watched rather than the file
/// itself, so editors replacing the file on save are still tracked.
pub struct FsChangeNotifier {
    state: Mutex<WatchState>,
    subscribed: Arc<RwLock<HashSet<DocumentKey>>>,
}

impl std::fmt::Debug for FsChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsChangeNotifier")
            .field("subscribed", &self.subscribed.read().len())
            .finish()
    }
}

impl FsChangeNotifier {
    pub fn new(event_tx: UnboundedSender<ChangeEvent>) -> notify::Result<Self> {
        let subscribed: Arc<RwLock<HashSet<DocumentKey>>> = Arc::default();

        let filter = subscribed.clone();
        let watcher = RecommendedWatcher::new(
            move |res: Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    for (position, path) in event.paths.iter().enumerate() {
                        let key = DocumentKey::new(path.clone());
                        if !filter.read().contains(&key) {
                            continue;
                        }
                        let Some(kind) = classify(&event.kind, position) else {
                            continue;
                        };
                        tracing::trace!(%key, ?kind, "Document changed");
                        if event_tx.send(ChangeEvent { key, kind }).is_err() {
                            tracing::debug!("Change receiver dropped");
                            return;
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(?err, "File watcher error");
                }
            },
            notify::Config::default(),
        )?;

        tracing::info!("Started file watcher");

        Ok(Self {
            state: Mutex::new(WatchState {
                watcher,
                watched_dirs: HashMap::new(),
            }),
            subscribed,
        })
    }
}

impl ChangeNotifier for FsChangeNotifier {
    fn subscribe(&self, key: &DocumentKey) {
        let Some(dir) = key.path().parent().map(|p| p.to_path_buf()) else {
            tracing::warn!(%key, "Document has no parent directory, not watching");
            return;
        };

        if !self.subscribed.write().insert(key.clone()) {
            return;
        }

        let mut state = self.state.lock();
        let WatchState {
            watcher,
            watched_dirs,
        } = &mut *state;
        if !watched_dirs.contains_key(&dir) {
            if let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                tracing::warn!(?err, dir = %dir.display(), "Failed to watch directory");
                self.subscribed.write().remove(key);
                return;
            }
            tracing::debug!(dir = %dir.display(), "Watching directory");
        }
        *watched_dirs.entry(dir).or_default() += 1;
    }

    fn unsubscribe(&self, key: &DocumentKey) {
        if !self.subscribed.write().remove(key) {
            return;
        }
        let Some(dir) = key.path().parent() else {
            return;
        };

        let mut state = self.state.lock();
        let WatchState {
            watcher,
            watched_dirs,
        } = &mut *state;
        if let Some(count) = watched_dirs.get_mut(dir) {
            *count -= 1;
            if *count == 0 {
                watched_dirs.remove(dir);
                if let Err(err) = watcher.unwatch(dir) {
                    tracing::debug!(?err, dir = %dir.display(), "Failed to unwatch directory");
                }
            }
        }
    }
}
