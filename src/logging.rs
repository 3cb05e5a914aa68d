//! Tracing subscriber setup for the binary.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name inside the data directory.
pub const LOG_FILE: &str = "restodir.log";

/// Filter used when RUST_LOG is unset.
const DEFAULT_FILTER: &str = "restodir=info";

/// Initialize the tracing subscriber, writing to a log file in `data_dir`.
///
/// stdout carries command output, so events never go to the terminal.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=restodir=debug).
/// The returned guard flushes buffered events on drop and must be held for
/// the lifetime of the process.
pub fn init(data_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(data_dir)
    .map_err(|e| eyre!("Failed to create data directory {}: {}", data_dir.display(), e))?;

  let appender = RollingFileAppender::builder()
    .rotation(Rotation::NEVER)
    .filename_prefix(LOG_FILE)
    .build(data_dir)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", data_dir.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
