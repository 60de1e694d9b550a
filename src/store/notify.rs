//! User-facing notifications raised by store mutations.

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Error,
}

/// Sink for toast-style messages.
pub trait Notifier: Send + Sync {
  fn show_toast(&self, message: &str, severity: Severity);
}

/// Writes toasts to the log. Useful for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn show_toast(&self, message: &str, severity: Severity) {
    match severity {
      Severity::Error => error!(toast = true, "{}", message),
      Severity::Success => info!(toast = true, ?severity, "{}", message),
    }
  }
}
