//! Who is using the client right now.

use std::sync::Arc;
use tracing::warn;

use super::TokenStore;
use crate::models::{Role, User};
use crate::storage::KeyValueStore;

const GUEST_KEY: &str = "isGuest";

/// Source of the current user and guest flag for permission checks.
pub trait SessionProvider: Send + Sync {
  /// The signed-in account, if any.
  fn current_user(&self) -> Option<User>;

  /// True for read-only browsing without an account.
  fn is_guest(&self) -> bool;

  fn has_role(&self, role: Role) -> bool {
    self
      .current_user()
      .map(|u| u.role == role)
      .unwrap_or(false)
  }
}

/// Session backed by the token store and a persisted guest flag.
///
/// Having no access token counts as a guest session too: nothing that
/// requires an account can succeed without one.
pub struct AuthSession {
  tokens: Arc<TokenStore>,
  storage: Arc<dyn KeyValueStore>,
}

impl AuthSession {
  pub fn new(tokens: Arc<TokenStore>, storage: Arc<dyn KeyValueStore>) -> Self {
    Self { tokens, storage }
  }

  fn guest_flag(&self) -> bool {
    match self.storage.get(GUEST_KEY) {
      Ok(value) => value.as_deref() == Some("true"),
      Err(e) => {
        warn!("Failed to read guest flag: {}", e);
        false
      }
    }
  }

  /// Enter guest browsing mode.
  pub fn continue_as_guest(&self) {
    if let Err(e) = self.storage.set(GUEST_KEY, "true") {
      warn!("Failed to store guest flag: {}", e);
    }
  }

  /// Leave guest mode, typically right after signing in.
  pub fn leave_guest_mode(&self) {
    if let Err(e) = self.storage.remove(GUEST_KEY) {
      warn!("Failed to clear guest flag: {}", e);
    }
  }
}

impl SessionProvider for AuthSession {
  fn current_user(&self) -> Option<User> {
    self.tokens.user()
  }

  fn is_guest(&self) -> bool {
    self.guest_flag() || self.tokens.token().is_none()
  }
}

/// Fixed session, for embedding hosts that manage auth themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
  pub user: Option<User>,
  pub guest: bool,
}

impl StaticSession {
  pub fn guest() -> Self {
    Self {
      user: None,
      guest: true,
    }
  }

  pub fn signed_in(user: User) -> Self {
    Self {
      user: Some(user),
      guest: false,
    }
  }
}

impl SessionProvider for StaticSession {
  fn current_user(&self) -> Option<User> {
    self.user.clone()
  }

  fn is_guest(&self) -> bool {
    self.guest
  }
}
