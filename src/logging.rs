//! # Logging
//!
//! The terminal belongs to the watch screen, so log output goes to a file:
//! `~/.cache/vatch/vatch.log` unless `--log-file` says otherwise. The level is
//! taken from `RUST_LOG` and defaults to `info`.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default log file location.
pub fn default_log_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "vatch")?;
    Some(dirs.cache_dir().join("vatch.log"))
}

/// Install the global subscriber, truncating the log file.
pub fn init(log_file_path: &Path) -> Result<()> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let log_file = File::create(log_file_path)
        .with_context(|| format!("Failed to create log file: {}", log_file_path.display()))?;

    build_subscriber(log_file, EnvFilter::try_from_default_env().ok())
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Subscriber writing to `log_file`, filtered by `filter` or `info`.
pub fn build_subscriber(
    log_file: File,
    filter: Option<EnvFilter>,
) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = filter.unwrap_or_else(|| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
}
