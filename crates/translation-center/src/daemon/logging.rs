use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "service.log";

/// Filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install a human stderr layer plus an hourly rolling JSON file layer under
/// `log_dir`. Keep the returned guard alive for the process lifetime or
/// buffered file records are lost.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create service log directory {}", log_dir.display()))?;
    let file_appender = rolling::hourly(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

/// Stderr-only subscriber for short CLI commands. A second call is a no-op.
pub fn init_cli_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
