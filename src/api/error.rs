//! Normalization of failed requests into flat, displayable reasons.
//!
//! Priority order, first match wins:
//! 1. Login endpoint: the server's field or generic error on 400, otherwise a
//!    fixed "login failed" reason
//! 2. 401 anywhere else: session expired (the caller clears auth data)
//! 3. Response body with `error`, `message` or `detail`
//! 4. No response at all: connectivity failure

use serde_json::Value;
use thiserror::Error;

pub const LOGIN_PATH: &str = "/api/auth/login/";

/// A failed API call, rendered as the reason a user should see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  #[error("{0}")]
  LoginFailed(String),

  #[error("Session expired. Please login again.")]
  SessionExpired,

  #[error("{message}")]
  Rejected { status: u16, message: String },

  #[error("Request failed with status code {0}")]
  Status(u16),

  #[error("Network error. Please check your internet connection.")]
  Network,

  #[error("Unexpected response from server: {0}")]
  Decode(String),
}

/// String at `key`, or the first string of an array at `key`.
fn text_field(body: &Value, key: &str) -> Option<String> {
  match body.get(key)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Array(items) => items.iter().find_map(|v| v.as_str().map(String::from)),
    _ => None,
  }
}

/// Classify a failed request.
///
/// `status` and `body` are `None` when no response was received. The client
/// never retries, so a 401 maps to [`ApiError::SessionExpired`] at most once
/// per request.
pub fn normalize(path: &str, status: Option<u16>, body: Option<&Value>) -> ApiError {
  if path.contains(LOGIN_PATH) {
    if status == Some(400) {
      if let Some(reason) = body.and_then(|b| {
        text_field(b, "non_field_errors").or_else(|| text_field(b, "error"))
      }) {
        return ApiError::LoginFailed(reason);
      }
    }
    return ApiError::LoginFailed("Login failed. Please try again.".to_string());
  }

  let Some(status) = status else {
    return ApiError::Network;
  };

  if status == 401 {
    return ApiError::SessionExpired;
  }

  if let Some(message) = body.and_then(|b| {
    text_field(b, "error")
      .or_else(|| text_field(b, "message"))
      .or_else(|| text_field(b, "detail"))
  }) {
    return ApiError::Rejected { status, message };
  }

  ApiError::Status(status)
}
