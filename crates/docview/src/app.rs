use crate::command;
use anyhow::Result;
use clap::Parser;
use docview_config::LoadedConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub enum RunCmd {
    /// Render a markdown or tabular document to HTML.
    #[clap(name = "render")]
    Render(command::render::Render),
    /// Parse a delimited text file into a table.
    #[clap(name = "table")]
    Table(command::table::Table),
    /// Render documents and re-render them whenever they change on disk.
    #[clap(name = "watch")]
    Watch(command::watch::Watch),
}

/// Docview CLI arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Enable the logging system, write the logs to this file.
    #[clap(long, global = true)]
    pub log: Option<PathBuf>,

    /// Specify the path of the config file.
    #[clap(long, global = true)]
    pub config_file: Option<PathBuf>,
}

impl RunCmd {
    pub async fn run(self, args: Args) -> Result<()> {
        let LoadedConfig {
            config,
            file_path,
            maybe_error,
        } = docview_config::load_config(args.config_file);

        let _guard = crate::logging::init(args.log, &config.log)?;

        if let Some(err) = maybe_error {
            tracing::warn!(path = %file_path.display(), %err, "Invalid config file, using the defaults");
        }

        match self {
            Self::Render(render) => render.run(&config).await,
            Self::Table(table) => table.run(&config).await,
            Self::Watch(watch) => watch.run(&config).await,
        }
    }
}
