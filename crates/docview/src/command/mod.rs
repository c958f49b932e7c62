pub mod render;
pub mod table;
pub mod watch;

use anyhow::Result;
use docview_core::{DocumentKey, RenderedOutput};
use std::io::Write;

/// Prints `output` to stdout, as one JSON line when `json` is set.
pub(crate) fn print_output(key: &DocumentKey, output: &RenderedOutput, json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if json {
        let line = serde_json::json!({ "key": key, "output": output });
        writeln!(lock, "{line}")?;
    } else {
        writeln!(lock, "==> {key} <==")?;
        write!(lock, "{}", output.html)?;
    }
    lock.flush()?;
    Ok(())
}
