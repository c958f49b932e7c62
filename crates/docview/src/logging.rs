use anyhow::{anyhow, Result};
use docview_config::LogConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_PATH_ENV: &str = "DOCVIEW_LOG_PATH";

/// Log files larger than this are truncated on startup.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

fn env_filter(default_level: LevelFilter, log_target: &str) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    for target in log_target.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match target.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(err) => eprintln!("Ignoring invalid log target `{target}`: {err}"),
        }
    }

    filter
}

/// Installs the global subscriber.
///
/// Logs go to the file given by `--log`, `DOCVIEW_LOG_PATH` or the config,
/// in that order, and to stderr otherwise. The returned guard flushes the
/// file writer on drop.
pub fn init(log: Option<PathBuf>, config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let maybe_log = log
        .or_else(|| std::env::var(LOG_PATH_ENV).ok().map(PathBuf::from))
        .or_else(|| config.log_file.as_ref().map(PathBuf::from));

    let Some(log_path) = maybe_log else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(LevelFilter::WARN, &config.log_target))
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
        return Ok(None);
    };

    if let Ok(metadata) = std::fs::metadata(&log_path) {
        if log_path.is_file() && metadata.len() > MAX_LOG_FILE_SIZE {
            std::fs::remove_file(&log_path)?;
        }
    }

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

    let directory = log_path
        .parent()
        .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let max_level = config.max_level.parse().unwrap_or(LevelFilter::DEBUG);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(env_filter(max_level, &config.log_target))
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Some(guard))
}
