use anyhow::{Context, Result};
use clap::Parser;
use docview_config::Config;
use docview_core::tabular::{self, Delimiter, TabularData, TabularOptions};
use docview_core::DocumentType;
use std::path::PathBuf;

/// Parses a CSV/TSV file and prints the table.
#[derive(Parser, Debug, Clone)]
pub struct Table {
    /// Delimited text file.
    #[clap(index = 1)]
    path: PathBuf,

    /// Field delimiter: comma, tab or semicolon. Inferred from the content
    /// by default, tab for `.tsv` files.
    #[clap(long)]
    delimiter: Option<Delimiter>,

    /// Maximum number of data rows.
    #[clap(long)]
    rows: Option<usize>,

    /// Maximum number of fields per row.
    #[clap(long)]
    columns: Option<usize>,

    /// Print the table as JSON instead of HTML.
    #[clap(long)]
    json: bool,
}

impl Table {
    fn options(&self, config: &Config) -> TabularOptions {
        let mut options = TabularOptions::from_config(&config.pipeline);
        options.delimiter = self.delimiter.or_else(|| {
            (DocumentType::from_path(&self.path) == Some(DocumentType::Tsv)).then_some(Delimiter::Tab)
        });
        if self.rows.is_some() {
            options.row_limit = self.rows;
        }
        if self.columns.is_some() {
            options.column_limit = self.columns;
        }
        options
    }

    fn parse(&self, config: &Config, bytes: &[u8]) -> Result<TabularData> {
        tabular::parse_bytes(bytes, &self.options(config))
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }

    pub async fn run(&self, config: &Config) -> Result<()> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let table = self.parse(config, &bytes)?;

        tracing::debug!(
            delimiter = ?table.delimiter,
            columns = table.column_count(),
            rows = table.rows.len(),
            "Parsed table"
        );

        if self.json {
            println!("{}", serde_json::to_string(&table)?);
        } else {
            print!("{}", table.to_html());
        }

        Ok(())
    }
}
