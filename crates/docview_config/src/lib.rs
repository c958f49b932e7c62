//! Configuration of the docview content pipeline.
//!
//! The configuration is read from a toml file, by default located at:
//!
//! - Linux: `~/.config/docview/config.toml`
//! - macOS: `~/Library/Application Support/org.docview.docview/config.toml`
//! - Windows: `~\AppData\Roaming\docview\docview\config\config.toml`
//!
//! Unlike a process-wide singleton, the loaded [`Config`] is an ordinary value
//! that callers pass to the components that need it.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Result of [`load_config`].
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Location the config was (or would have been) read from.
    pub file_path: PathBuf,
    /// Set when the file exists but is not valid toml for [`Config`].
    ///
    /// The default config is used in that case.
    pub maybe_error: Option<toml::de::Error>,
}

/// Returns the default location of `config.toml`, if a home directory is known.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "docview", "docview")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Loads the config from `specified_config_file` or the default location.
///
/// A missing file is not an error, the defaults are used silently.
pub fn load_config(specified_config_file: Option<PathBuf>) -> LoadedConfig {
    let file_path = specified_config_file
        .or_else(default_config_file)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut maybe_error = None;
    let config = match std::fs::read_to_string(&file_path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %file_path.display(), "Invalid config file, using defaults");
            maybe_error.replace(err);
            Config::default()
        }),
        Err(err) => {
            tracing::debug!(path = %file_path.display(), ?err, "No config file loaded");
            Config::default()
        }
    };

    LoadedConfig {
        config,
        file_path,
        maybe_error,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LogConfig {
    /// Specify the log file path.
    ///
    /// This path must be an absolute path.
    pub log_file: Option<String>,

    /// Specify the max log level.
    pub max_level: String,

    /// Specify the log target to enable more detailed logging.
    ///
    /// ```toml
    /// [log]
    /// log-target = "docview_core::coordinator=trace"
    /// ```
    pub log_target: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            max_level: "debug".into(),
            log_target: "".into(),
        }
    }
}

/// Cache, scheduling and parser limits of the content pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum age of a cached rendering.
    pub ttl_seconds: u64,

    /// Hard cap of cached renderings, the oldest 20% are evicted past it.
    pub max_cache_entries: usize,

    /// Quiet period after the last edit before the buffer is re-rendered.
    pub debounce_ms: u64,

    /// Manual refresh requests closer than this to the previous one are ignored.
    pub refresh_min_interval_ms: u64,

    /// Stop collecting table rows after this many rows.
    pub csv_row_limit: Option<usize>,

    /// Stop collecting table fields after this many fields per row.
    pub csv_column_limit: Option<usize>,

    /// Table fields longer than this many characters are truncated.
    pub max_field_length: usize,

    /// Timeout of a single read from the source store.
    pub read_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_cache_entries: 50,
            debounce_ms: 300,
            refresh_min_interval_ms: 500,
            csv_row_limit: None,
            csv_column_limit: None,
            max_field_length: 10_000,
            read_timeout_ms: 5_000,
        }
    }
}

impl PipelineConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_min_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_min_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// How raw HTML embedded in markdown is emitted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub enum RawHtmlPolicy {
    /// Emit raw HTML verbatim.
    ///
    /// Documents can then inject arbitrary markup (and scripts) into the preview.
    #[default]
    Passthrough,
    /// Escape raw HTML so it is displayed as text.
    Escape,
}

/// Markdown rendering options.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct MarkupConfig {
    /// Language tag of the fenced blocks extracted as diagrams.
    pub diagram_language: String,

    /// Raw HTML handling.
    pub raw_html: RawHtmlPolicy,

    /// Enable GitHub Flavored Markdown tables.
    pub tables: bool,

    /// Enable `~~strikethrough~~`.
    pub strikethrough: bool,

    /// Enable `[x]` task list items.
    pub tasklists: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            diagram_language: "mermaid".into(),
            raw_html: RawHtmlPolicy::Passthrough,
            tables: true,
            strikethrough: true,
            tasklists: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Log configuration.
    pub log: LogConfig,

    /// Content pipeline configuration.
    pub pipeline: PipelineConfig,

    /// Markdown rendering configuration.
    pub markup: MarkupConfig,
}
