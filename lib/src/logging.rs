//! Logging setup for the stage binaries.
//!
//! Installs a global tracing subscriber that writes to stdout and to a
//! daily-rolling file under the configured log directory. Library code never
//! calls this; stages log through the span they were constructed with.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::error::{ErrorKind, PipelineError, Result};

const LOG_FILE_PREFIX: &str = "pipeline.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install stdout and file logging. Subsequent calls are no-ops.
pub fn init<P: AsRef<Path>>(log_dir: P) -> Result<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir).map_err(|e| {
        PipelineError::with_source(
            ErrorKind::Io,
            format!("cannot create log directory {}", log_dir.display()),
            e,
        )
    })?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        PipelineError::with_source(ErrorKind::Io, "cannot install tracing subscriber", e)
    })?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("logging initialized in {}", log_dir.display());
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
