//! Property cache and fetch coordinator.
//!
//! [`PropertyStore`] owns the visible property lists, the favorites list and
//! the caches in front of the API:
//!
//! - list results keyed by [`FilterSignature`], valid for the cache window
//! - resolved image URLs keyed by the property's sorted image id set
//! - the time of the last favorites fetch
//!
//! All mutations go through one lock and every change is published on a
//! `watch` channel, so background image resolution and foreground operations
//! never race on the same state.

mod account;
mod favorites;
mod images;
mod notify;
mod optimistic;
mod properties;
mod state;
#[cfg(test)]
mod testing;

pub use notify::{LogNotifier, Notifier, Severity};
pub use optimistic::Optimistic;
pub use state::StoreState;

use chrono::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::api::{PropertyApi, PropertyPage};
use crate::auth::SessionProvider;
use crate::cache::{FetchStamp, FilterSignature, ImageUrlCache, TtlCache, DEFAULT_TTL_SECS};
use crate::error::StoreError;
use crate::models::Role;

/// Favorites are fetched as a single large page.
pub const DEFAULT_FAVORITES_PAGE_SIZE: u32 = 100;

/// Upper bound on image URL requests in flight for one resolution pass.
const MAX_CONCURRENT_IMAGE_REQUESTS: usize = 4;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  pub cache_ttl: Duration,
  pub favorites_page_size: u32,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      cache_ttl: Duration::seconds(DEFAULT_TTL_SECS),
      favorites_page_size: DEFAULT_FAVORITES_PAGE_SIZE,
    }
  }
}

impl StoreOptions {
  pub fn with_cache_duration(mut self, ttl: Duration) -> Self {
    self.cache_ttl = ttl;
    self
  }

  pub fn with_favorites_page_size(mut self, size: u32) -> Self {
    self.favorites_page_size = size.max(1);
    self
  }
}

// ============================================================================
// Store
// ============================================================================

struct Caches {
  pages: TtlCache<FilterSignature, PropertyPage>,
  images: ImageUrlCache,
  favorites_fetched: FetchStamp,
}

impl Caches {
  fn new(ttl: Duration) -> Self {
    Self {
      pages: TtlCache::new(ttl),
      images: ImageUrlCache::new(),
      favorites_fetched: FetchStamp::new(ttl),
    }
  }
}

struct Shared {
  state: StoreState,
  caches: Caches,
}

struct Inner {
  api: Arc<dyn PropertyApi>,
  session: Arc<dyn SessionProvider>,
  notifier: Arc<dyn Notifier>,
  options: StoreOptions,
  shared: Mutex<Shared>,
  tx: watch::Sender<StoreState>,
}

/// Application-scoped handle to the property cache. Cheap to clone.
#[derive(Clone)]
pub struct PropertyStore {
  inner: Arc<Inner>,
}

impl PropertyStore {
  pub fn new(
    api: Arc<dyn PropertyApi>,
    session: Arc<dyn SessionProvider>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self::with_options(api, session, notifier, StoreOptions::default())
  }

  pub fn with_options(
    api: Arc<dyn PropertyApi>,
    session: Arc<dyn SessionProvider>,
    notifier: Arc<dyn Notifier>,
    options: StoreOptions,
  ) -> Self {
    let (tx, _) = watch::channel(StoreState::default());
    Self {
      inner: Arc::new(Inner {
        api,
        session,
        notifier,
        options,
        shared: Mutex::new(Shared {
          state: StoreState::default(),
          caches: Caches::new(options.cache_ttl),
        }),
        tx,
      }),
    }
  }

  pub fn options(&self) -> StoreOptions {
    self.inner.options
  }

  /// Receive every published state change.
  pub fn subscribe(&self) -> watch::Receiver<StoreState> {
    self.inner.tx.subscribe()
  }

  /// Copy of the current state.
  pub fn snapshot(&self) -> StoreState {
    self.inner.tx.borrow().clone()
  }

  pub fn clear_error(&self) {
    self.update(|state| state.error = None);
  }

  /// Drop every cache and list, as on sign-out.
  pub fn clear_cache(&self) {
    let ttl = self.inner.options.cache_ttl;
    self.update_shared(|shared| {
      shared.caches = Caches::new(ttl);
      let state = &mut shared.state;
      state.properties.clear();
      state.my_properties.clear();
      state.favorites.clear();
      state.my_property_count = 0;
      state.error = None;
    });
  }

  // ==========================================================================
  // Internal helpers
  // ==========================================================================

  fn lock(&self) -> MutexGuard<'_, Shared> {
    // State stays consistent across a panicked writer: every update is a
    // single closure over owned values.
    self
      .inner
      .shared
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Mutate state and publish the result.
  fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
    self.update_shared(|shared| f(&mut shared.state))
  }

  /// Mutate state and caches together, then publish the state.
  fn update_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
    let mut shared = self.lock();
    let out = f(&mut shared);
    self.inner.tx.send_replace(shared.state.clone());
    out
  }

  fn busy(&self, flag: Flag) -> Busy<'_> {
    self.update(|state| *flag.slot(state) = true);
    Busy { store: self, flag }
  }

  /// Record a failure in state and optionally toast it.
  fn fail(&self, error: StoreError, toast: bool) -> StoreError {
    let reason = error.to_string();
    self.update(|state| state.error = Some(reason.clone()));
    if toast {
      self.inner.notifier.show_toast(&reason, Severity::Error);
    }
    error
  }

  fn toast(&self, message: &str) {
    self.inner.notifier.show_toast(message, Severity::Success);
  }

  fn require_login(&self, reason: &str) -> Result<(), StoreError> {
    if self.inner.session.is_guest() {
      return Err(StoreError::permission(reason));
    }
    Ok(())
  }

  fn require_role(&self, role: Role, login_reason: &str, role_reason: &str) -> Result<(), StoreError> {
    self.require_login(login_reason)?;
    if !self.inner.session.has_role(role) {
      return Err(StoreError::permission(role_reason));
    }
    Ok(())
  }

  /// Signed in with the given role, without raising anything.
  fn acting_as(&self, role: Role) -> bool {
    !self.inner.session.is_guest() && self.inner.session.has_role(role)
  }
}

// ============================================================================
// Loading flags
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Flag {
  Loading,
  Properties,
  Favorites,
  StatusChange,
}

impl Flag {
  fn slot(self, state: &mut StoreState) -> &mut bool {
    match self {
      Self::Loading => &mut state.loading,
      Self::Properties => &mut state.properties_loading,
      Self::Favorites => &mut state.favorites_loading,
      Self::StatusChange => &mut state.status_change_loading,
    }
  }
}

/// Holds a loading flag up until dropped.
struct Busy<'a> {
  store: &'a PropertyStore,
  flag: Flag,
}

impl Drop for Busy<'_> {
  fn drop(&mut self) {
    let flag = self.flag;
    self.store.update(|state| *flag.slot(state) = false);
  }
}
