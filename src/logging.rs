//! File-based tracing setup.
//!
//! Logs go to a daily-rotated file so command output on stdout stays clean.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

const LOG_FILE_PREFIX: &str = "haven.log";

/// Filter directive for a configured level. A bare level applies to this
/// crate only; anything containing `=` or `,` is used verbatim.
pub fn filter_directive(level: &str) -> String {
  let level = level.trim();
  if level.is_empty() {
    "haven=info".to_string()
  } else if level.contains('=') || level.contains(',') {
    level.to_string()
  } else {
    format!("haven={}", level)
  }
}

pub fn default_log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(data_dir.join("haven").join("logs"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process, or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let dir = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_log_dir()?,
  };
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(filter_directive(&config.level)))
    .map_err(|e| eyre!("Invalid log filter: {}", e))?;

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
