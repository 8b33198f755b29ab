use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "fortune-watcher";
const STDERR_FILTER: &str = "info";
const FILE_FILTER: &str = "info,fortune_client=debug";

/// Hourly rolling log files in `dir`, written off the calling thread.
pub fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(48)
        .build(dir)
        .with_context(|| format!("failed to open log directory {}", dir.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Logs go to stderr, filtered by `RUST_LOG`, and to `log_dir` when given.
/// Stdout is left to command output. The returned guard flushes the file
/// writer when dropped.
pub fn setup_telemetry(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDERR_FILTER)),
    );

    let (file_layer, guard) = match log_dir.map(file_writer).transpose() {
        Ok(Some((writer, guard))) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        Ok(None) => (None, None),
        Err(e) => {
            eprintln!("Logging to stderr only: {:#}", e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}
