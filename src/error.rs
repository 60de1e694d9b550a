//! Failures surfaced by the property store.

use thiserror::Error;

use crate::api::ApiError;

/// A store operation failure. `Display` is the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  /// Guest or wrong role; raised before any network call.
  #[error("{0}")]
  Permission(String),

  /// Rejected locally before any network call.
  #[error("{0}")]
  Validation(String),

  #[error(transparent)]
  Api(#[from] ApiError),
}

impl StoreError {
  pub fn permission(reason: impl Into<String>) -> Self {
    Self::Permission(reason.into())
  }

  pub fn validation(reason: impl Into<String>) -> Self {
    Self::Validation(reason.into())
  }

  /// True when the request never reached the backend.
  pub fn is_local(&self) -> bool {
    matches!(self, Self::Permission(_) | Self::Validation(_))
  }
}
