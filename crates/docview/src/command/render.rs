use anyhow::{Context, Result};
use clap::Parser;
use docview_config::Config;
use docview_core::{DocumentKey, FsSourceStore, RenderCoordinator};
use std::path::PathBuf;
use std::sync::Arc;

/// Renders a document once.
#[derive(Parser, Debug, Clone)]
pub struct Render {
    /// Document to render, the type is detected from the extension.
    #[clap(index = 1)]
    path: PathBuf,

    /// Print the rendering as JSON, diagram blocks included.
    #[clap(long)]
    json: bool,

    /// Write the result to this file instead of stdout.
    #[clap(long, short)]
    output: Option<PathBuf>,
}

impl Render {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let store = Arc::new(FsSourceStore::new(config.pipeline.read_timeout()));
        let (coordinator, _events) = RenderCoordinator::new(store, config, None);

        let key = DocumentKey::canonical(&self.path);
        let output = coordinator
            .load_document(&key)
            .await
            .with_context(|| format!("failed to render {}", self.path.display()))?;

        if let Some(error) = &output.error {
            tracing::warn!(%key, error, "Showing the raw source");
        }

        let text = if self.json {
            serde_json::to_string_pretty(&output)?
        } else {
            output.html
        };

        match &self.output {
            Some(path) => std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => print!("{text}"),
        }

        Ok(())
    }
}
