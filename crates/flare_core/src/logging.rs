use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::StarterConfig;

const LOG_FILE_PREFIX: &str = "flarestarter";

/// `RUST_LOG` wins over the configured level.
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Configured level for dependencies, debug for the workspace crates.
fn default_directives(level: &str) -> String {
    format!("{level},flare_core=debug,flare_chain=debug,flare_ai=debug")
}

/// Daily-rolling file writer under `dir`.
fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// File + stderr logging under `~/.flarestarter/logs`. Keep the guard alive
/// for the life of the process or buffered lines are lost.
pub fn init_logging(config: &StarterConfig) -> Result<WorkerGuard> {
    let (writer, guard) = file_writer(&StarterConfig::logs_dir()?)?;

    tracing_subscriber::registry()
        .with(filter(&config.log_level))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// File-only logging into `logs_dir`, for embedding hosts and tests.
pub fn init_logging_to_dir(logs_dir: &Path, level: &str) -> Result<WorkerGuard> {
    let (writer, guard) = file_writer(logs_dir)?;

    tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
