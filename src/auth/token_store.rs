//! Token storage with an in-memory mirror.
//!
//! Reads are served from the mirror, which is hydrated from persistent
//! storage on first use. Writes go to storage first and only then to the
//! mirror.
//!
//! Storage failures are logged and swallowed. Losing a token write only means
//! the user has to sign in again on the next launch, so none of these methods
//! return errors.

use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::models::User;
use crate::storage::KeyValueStore;

const TOKEN_KEY: &str = "auth_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "auth_user";

#[derive(Debug, Default)]
struct Mirror {
  token: Option<String>,
  refresh_token: Option<String>,
  user: Option<User>,
  hydrated: bool,
}

/// Access token, refresh token and user record, persisted best-effort.
pub struct TokenStore {
  storage: Arc<dyn KeyValueStore>,
  mirror: RwLock<Mirror>,
}

impl TokenStore {
  pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
    Self {
      storage,
      mirror: RwLock::new(Mirror::default()),
    }
  }

  /// Load the mirror from storage. Safe to call repeatedly; only the first
  /// call reads storage.
  pub fn hydrate(&self) {
    if self.read(|m| m.hydrated) {
      return;
    }

    let mut mirror = self.mirror.write().unwrap_or_else(PoisonError::into_inner);
    if mirror.hydrated {
      return;
    }

    match self.load_all() {
      Ok((token, refresh_token, user)) => {
        mirror.token = token;
        mirror.refresh_token = refresh_token;
        mirror.user = user;
      }
      Err(e) => warn!("Failed to hydrate token store, starting signed out: {}", e),
    }
    // A failed hydration is not retried; the mirror starts empty instead.
    mirror.hydrated = true;
    debug!(
      has_token = mirror.token.is_some(),
      has_user = mirror.user.is_some(),
      "Token store hydrated"
    );
  }

  fn load_all(&self) -> color_eyre::Result<(Option<String>, Option<String>, Option<User>)> {
    let token = self.storage.get(TOKEN_KEY)?;
    let refresh_token = self.storage.get(REFRESH_TOKEN_KEY)?;
    let user = match self.storage.get(USER_KEY)? {
      Some(json) => Some(serde_json::from_str(&json)?),
      None => None,
    };
    Ok((token, refresh_token, user))
  }

  fn read<R>(&self, f: impl FnOnce(&Mirror) -> R) -> R {
    let mirror = self.mirror.read().unwrap_or_else(PoisonError::into_inner);
    f(&mirror)
  }

  fn update(&self, f: impl FnOnce(&mut Mirror)) {
    let mut mirror = self.mirror.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut mirror);
  }

  pub fn token(&self) -> Option<String> {
    self.hydrate();
    self.read(|m| m.token.clone())
  }

  pub fn refresh_token(&self) -> Option<String> {
    self.hydrate();
    self.read(|m| m.refresh_token.clone())
  }

  pub fn user(&self) -> Option<User> {
    self.hydrate();
    self.read(|m| m.user.clone())
  }

  pub fn set_token(&self, token: &str) {
    match self.storage.set(TOKEN_KEY, token) {
      Ok(()) => self.update(|m| m.token = Some(token.to_string())),
      Err(e) => warn!("Error storing token: {}", e),
    }
  }

  pub fn remove_token(&self) {
    match self.storage.remove(TOKEN_KEY) {
      Ok(()) => self.update(|m| m.token = None),
      Err(e) => warn!("Error removing token: {}", e),
    }
  }

  pub fn set_refresh_token(&self, refresh_token: &str) {
    match self.storage.set(REFRESH_TOKEN_KEY, refresh_token) {
      Ok(()) => self.update(|m| m.refresh_token = Some(refresh_token.to_string())),
      Err(e) => warn!("Error storing refresh token: {}", e),
    }
  }

  pub fn remove_refresh_token(&self) {
    match self.storage.remove(REFRESH_TOKEN_KEY) {
      Ok(()) => self.update(|m| m.refresh_token = None),
      Err(e) => warn!("Error removing refresh token: {}", e),
    }
  }

  pub fn set_user(&self, user: &User) {
    let json = match serde_json::to_string(user) {
      Ok(json) => json,
      Err(e) => {
        warn!("Error serializing user data: {}", e);
        return;
      }
    };
    match self.storage.set(USER_KEY, &json) {
      Ok(()) => self.update(|m| m.user = Some(user.clone())),
      Err(e) => warn!("Error storing user data: {}", e),
    }
  }

  pub fn remove_user(&self) {
    match self.storage.remove(USER_KEY) {
      Ok(()) => self.update(|m| m.user = None),
      Err(e) => warn!("Error removing user data: {}", e),
    }
  }

  /// Forget every piece of auth data.
  pub fn clear_auth_data(&self) {
    match self
      .storage
      .remove_many(&[TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY])
    {
      Ok(()) => self.update(|m| {
        m.token = None;
        m.refresh_token = None;
        m.user = None;
      }),
      Err(e) => warn!("Error clearing auth data: {}", e),
    }
  }
}
