use super::print_output;
use anyhow::{Context, Result};
use clap::Parser;
use docview_config::Config;
use docview_core::{
    ChangeNotifier, CoordinatorEvent, DocumentKey, FsChangeNotifier, FsSourceStore,
    RenderCoordinator,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Renders documents and prints a fresh rendering whenever one changes on
/// disk, until interrupted.
#[derive(Parser, Debug, Clone)]
pub struct Watch {
    /// Documents to watch.
    #[clap(index = 1, required = true)]
    paths: Vec<PathBuf>,

    /// Print each rendering as one JSON line.
    #[clap(long)]
    json: bool,
}

impl Watch {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let store = Arc::new(FsSourceStore::new(config.pipeline.read_timeout()));
        let (change_tx, change_rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier: Arc<dyn ChangeNotifier> =
            Arc::new(FsChangeNotifier::new(change_tx).context("failed to start the file watcher")?);

        let (coordinator, mut events) = RenderCoordinator::new(store, config, Some(notifier));
        let listener = coordinator.spawn_change_listener(change_rx);

        let keys: Vec<DocumentKey> = self.paths.iter().map(DocumentKey::canonical).collect();

        for key in &keys {
            coordinator.open(key);
            let output = coordinator
                .load_document(key)
                .await
                .with_context(|| format!("failed to render {key}"))?;
            print_output(key, &output, self.json)?;
        }

        tracing::info!(documents = keys.len(), "Watching for changes");

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(CoordinatorEvent::Rendered { key, output }) => {
                            print_output(&key, &output, self.json)?;
                        }
                        Some(CoordinatorEvent::Conflict { key, kind }) => {
                            tracing::warn!(%key, ?kind, "Conflicting change");
                        }
                        Some(CoordinatorEvent::SourceRemoved { key }) => {
                            eprintln!("{key} was removed");
                        }
                        Some(CoordinatorEvent::Failed { key, error }) => {
                            eprintln!("failed to render {key}: {error}");
                        }
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::debug!("Interrupted");
                    break;
                }
            }
        }

        for key in &keys {
            coordinator.close(key);
        }
        listener.abort();

        Ok(())
    }
}
