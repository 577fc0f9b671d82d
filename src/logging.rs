//! Logging setup: stderr for the operator, plus a run log file in the temp
//! directory so a finished migration leaves an audit trail behind.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing. Honors `RUST_LOG` if set; defaults to info-level
/// output for this crate otherwise. When `log_file` is given, everything
/// also goes to that file without ANSI colors.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("worklift=info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(path) = log_file {
        let file = std::fs::File::create(path)?;
        let file_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
        tracing::subscriber::set_global_default(subscriber.with(file_layer))?;
    } else {
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Run log lives in the temp directory, one file per run.
pub fn default_run_log_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    std::env::temp_dir().join(format!("worklift-{stamp}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_log_path_lands_in_temp_dir() {
        let path = default_run_log_path();
        assert!(path.starts_with(std::env::temp_dir()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("worklift-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn init_writes_the_run_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        init(Some(&path)).unwrap();
        tracing::info!("logging smoke test line");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("logging smoke test line"));
    }
}
