//! Seeker favorites, with optimistic add and remove.

use chrono::Utc;
use tracing::{debug, error, info};

use super::{Flag, Optimistic, PropertyStore};
use crate::error::StoreError;
use crate::models::{Favorite, FavoriteId, Property, PropertyId, Role};

const LOGIN_TO_MANAGE: &str = "Please login to manage favorites";
const SEEKERS_ONLY: &str = "Only seekers can manage favorites";

/// Is this the placeholder inserted for `id` under `placeholder`?
fn is_placeholder(favorite: &Favorite, placeholder: &FavoriteId, id: &PropertyId) -> bool {
  favorite.id == *placeholder && favorite.property_id == *id
}

impl PropertyStore {
  /// Favorite a property.
  ///
  /// If the property is in the visible list a placeholder favorite goes to
  /// the head of `favorites` straight away. It is swapped for the server's
  /// record on success and removed on failure. Other entries, provisional or
  /// not, are left alone either way.
  pub async fn add_to_favorites(&self, id: &PropertyId) -> Result<Favorite, StoreError> {
    self.require_role(
      Role::Seeker,
      "Please login to add favorites",
      "Only seekers can add favorites",
    )?;

    let now = Utc::now();
    let (pending, placeholder) = self.update(|state| {
      let property = state
        .find_property(id)
        .filter(|_| !state.is_favorite(id))
        .cloned();
      let mut placeholder = None;
      let pending = Optimistic::begin(&mut state.favorites, |favorites| {
        if let Some(property) = property {
          let favorite = Favorite::provisional(property, now);
          placeholder = Some(favorite.id.clone());
          favorites.insert(0, favorite);
        }
      });
      (pending, placeholder)
    });

    match self.inner.api.add_to_favorites(id).await {
      Ok(confirmed) => {
        let confirmed = self.update(|state| {
          let mut confirmed = confirmed;
          pending.commit(&mut state.favorites, |favorites| {
            let index = placeholder
              .as_ref()
              .and_then(|p| favorites.iter().position(|f| is_placeholder(f, p, id)));
            match index {
              Some(index) => {
                let placeholder = favorites.remove(index);
                if confirmed.property.is_none() {
                  confirmed.property = placeholder.property;
                }
                favorites.insert(index, confirmed.clone());
              }
              None if !favorites.iter().any(|f| f.refers_to(id)) => {
                favorites.insert(0, confirmed.clone());
              }
              None => {}
            }
          });
          confirmed
        });
        info!(%id, favorite = %confirmed.id, "Added to favorites");
        self.toast("Added to favorites");
        Ok(confirmed)
      }
      Err(e) => {
        self.update(|state| {
          pending.undo(&mut state.favorites, |favorites| {
            if let Some(placeholder) = &placeholder {
              favorites.retain(|f| !is_placeholder(f, placeholder, id))
            }
          })
        });
        Err(self.fail(e.into(), true))
      }
    }
  }

  /// Unfavorite a property. The entry disappears immediately and the list is
  /// restored as it was if the server refuses.
  pub async fn remove_from_favorites(&self, id: &PropertyId) -> Result<(), StoreError> {
    self.require_role(Role::Seeker, LOGIN_TO_MANAGE, SEEKERS_ONLY)?;

    let pending = self.update(|state| {
      Optimistic::begin(&mut state.favorites, |favorites| {
        favorites.retain(|f| !f.refers_to(id))
      })
    });

    match self.inner.api.remove_from_favorites(id).await {
      Ok(()) => {
        self.update(|state| pending.commit(&mut state.favorites, |_| {}));
        info!(%id, "Removed from favorites");
        self.toast("Removed from favorites");
        Ok(())
      }
      Err(e) => {
        self.update(|state| pending.rollback(&mut state.favorites));
        Err(self.fail(e.into(), true))
      }
    }
  }

  /// Flip a favorite on the server and mirror the outcome locally.
  /// Returns whether the property is now a favorite.
  pub async fn toggle_favorite(&self, id: &PropertyId) -> Result<bool, StoreError> {
    self.require_role(Role::Seeker, LOGIN_TO_MANAGE, SEEKERS_ONLY)?;

    let response = match self.inner.api.toggle_favorite(id).await {
      Ok(response) => response,
      Err(e) => return Err(self.fail(e.into(), true)),
    };

    let now = Utc::now();
    self.update_shared(|shared| {
      let state = &mut shared.state;
      if !response.favorited {
        state.favorites.retain(|f| !f.refers_to(id));
        return;
      }
      if state.is_favorite(id) {
        return;
      }
      let property = state.find_property(id).cloned();
      let favorite_id = match &response.favorite_id {
        Some(favorite_id) => favorite_id.clone(),
        None => {
          // Placeholder until the next favorites fetch
          shared.caches.favorites_fetched.reset();
          FavoriteId::provisional(now)
        }
      };
      state.favorites.insert(
        0,
        Favorite {
          id: favorite_id,
          property_id: id.clone(),
          property,
          created_at: Some(now),
        },
      );
    });

    let message = match (&response.message, response.favorited) {
      (Some(message), _) => message.as_str(),
      (None, true) => "Added to favorites",
      (None, false) => "Removed from favorites",
    };
    self.toast(message);
    Ok(response.favorited)
  }

  /// Ask the server whether a property is favorited. Sessions that cannot
  /// have favorites get `false` without a request.
  pub async fn favorite_status(&self, id: &PropertyId) -> Result<bool, StoreError> {
    if !self.acting_as(Role::Seeker) {
      return Ok(false);
    }
    self
      .inner
      .api
      .get_favorite_status(id)
      .await
      .map_err(|e| self.fail(e.into(), false))
  }

  /// Load the seeker's favorites.
  ///
  /// Guests and non-seekers are a silent no-op, and so is any call inside the
  /// cache window after a successful fetch.
  pub async fn fetch_favorites(&self) -> Result<(), StoreError> {
    if !self.acting_as(Role::Seeker) {
      debug!("Favorites skipped, not a seeker session");
      return Ok(());
    }

    let now = Utc::now();
    if self.lock().caches.favorites_fetched.is_fresh(now) {
      debug!("Favorites still fresh");
      return Ok(());
    }

    let _busy = self.busy(Flag::Favorites);
    let page_size = self.inner.options.favorites_page_size;
    let page = match self.inner.api.get_favorite_properties(1, page_size).await {
      Ok(page) => page,
      Err(e) => {
        error!("Failed to fetch favorites: {}", e);
        return Err(self.fail(e.into(), false));
      }
    };

    let favorites: Vec<Favorite> = page
      .favorites
      .into_iter()
      .map(|mut favorite| {
        favorite.property = favorite.property.map(Property::with_pending_images);
        favorite
      })
      .collect();
    let nested: Vec<Property> = favorites.iter().filter_map(|f| f.property.clone()).collect();

    self.update_shared(|shared| {
      shared.caches.favorites_fetched.touch(now);
      shared.state.favorites = favorites;
    });

    self.spawn_image_resolution(nested);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::super::testing::*;
  use super::super::{Severity, StoreOptions};
  use super::*;
  use crate::api::ToggleFavoriteResponse;
  use crate::cache::PropertyFilters;
  use chrono::Duration;

  async fn loaded(api: FakeApi) -> (PropertyStore, std::sync::Arc<FakeApi>, std::sync::Arc<RecordingNotifier>) {
    let api = api.with_page(1, vec![Property::new("P1", "Loft"), Property::new("P2", "Flat")]);
    let (store, api, notifier) = harness(api, seeker());
    store
      .fetch_properties(&PropertyFilters::page(1, 10), false)
      .await
      .unwrap();
    (store, api, notifier)
  }

  fn stored_favorite(id: &str, property: &str) -> Favorite {
    Favorite {
      id: FavoriteId::new(id),
      property_id: PropertyId::new(property),
      property: Some(Property::new(property, property)),
      created_at: None,
    }
  }

  #[tokio::test]
  async fn test_failed_add_leaves_favorites_untouched() {
    let api = FakeApi::new();
    api.fail("add_to_favorites");
    let (store, _, notifier) = loaded(api).await;
    store.update(|state| state.favorites = vec![stored_favorite("1", "P2")]);
    let before = store.snapshot().favorites;

    let err = store
      .add_to_favorites(&PropertyId::new("P1"))
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "add_to_favorites failed");
    assert_eq!(store.snapshot().favorites, before);
    assert_eq!(
      store.snapshot().error.as_deref(),
      Some("add_to_favorites failed")
    );
    assert_eq!(
      notifier.last(),
      Some(("add_to_favorites failed".to_string(), Severity::Error))
    );
  }

  #[tokio::test]
  async fn test_add_reconciles_with_server_id() {
    let (store, _, notifier) = loaded(FakeApi::new()).await;
    let id = PropertyId::new("P1");

    let favorite = store.add_to_favorites(&id).await.unwrap();

    let favorites: Vec<Favorite> = store
      .snapshot()
      .favorites
      .into_iter()
      .filter(|f| f.refers_to(&id))
      .collect();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id.as_str(), CONFIRMED_FAVORITE_ID);
    assert!(!favorites[0].id.is_provisional());
    // Server answered with a bare property id; the listed property is kept
    assert_eq!(favorites[0].property.as_ref().unwrap().title, "Loft");
    assert_eq!(favorite.id, favorites[0].id);
    assert_eq!(notifier.last().unwrap().0, "Added to favorites");
  }

  #[tokio::test]
  async fn test_add_for_unlisted_property_still_records_favorite() {
    let (store, _, _) = loaded(FakeApi::new()).await;
    let id = PropertyId::new("ELSEWHERE");

    store.add_to_favorites(&id).await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.favorites.len(), 1);
    assert!(state.favorites[0].refers_to(&id));
  }

  #[tokio::test]
  async fn test_provider_cannot_add_favorites() {
    let (store, api, _) = harness(FakeApi::new(), provider());
    let err = store
      .add_to_favorites(&PropertyId::new("P1"))
      .await
      .unwrap_err();
    assert_eq!(
      err,
      StoreError::Permission("Only seekers can add favorites".to_string())
    );
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_guest_cannot_add_favorites() {
    let (store, api, _) = harness(FakeApi::new(), guest());
    let err = store
      .add_to_favorites(&PropertyId::new("P1"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Please login to add favorites");
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_remove_restores_list_on_failure() {
    let api = FakeApi::new();
    api.fail("remove_from_favorites");
    let (store, _, _) = loaded(api).await;
    let before = vec![stored_favorite("1", "P1"), stored_favorite("2", "P2")];
    store.update(|state| state.favorites = before.clone());

    assert!(store
      .remove_from_favorites(&PropertyId::new("P1"))
      .await
      .is_err());
    assert_eq!(store.snapshot().favorites, before);
  }

  #[tokio::test]
  async fn test_remove_on_success() {
    let (store, _, notifier) = loaded(FakeApi::new()).await;
    store.update(|state| state.favorites = vec![stored_favorite("1", "P1")]);

    store
      .remove_from_favorites(&PropertyId::new("P1"))
      .await
      .unwrap();

    assert!(store.snapshot().favorites.is_empty());
    assert_eq!(notifier.last().unwrap().0, "Removed from favorites");
  }

  #[tokio::test]
  async fn test_provider_cannot_remove_favorites() {
    let (store, api, _) = harness(FakeApi::new(), provider());
    let err = store
      .remove_from_favorites(&PropertyId::new("P1"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Only seekers can manage favorites");
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_fetch_favorites_skips_inside_window() {
    let api = FakeApi::new().with_favorites(vec![stored_favorite("1", "P1")]);
    let (store, api, _) = harness(api, seeker());

    store.fetch_favorites().await.unwrap();
    store.update(|state| state.favorites.clear());
    store.fetch_favorites().await.unwrap();

    assert_eq!(api.count("get_favorite_properties"), 1);
    // Hard skip: local state is not refreshed
    assert!(store.snapshot().favorites.is_empty());
  }

  #[tokio::test]
  async fn test_fetch_favorites_after_window() {
    let api = FakeApi::new().with_favorites(vec![stored_favorite("1", "P1")]);
    let options = StoreOptions::default().with_cache_duration(Duration::zero());
    let (store, api, _) = harness_with(api, seeker(), options);

    store.fetch_favorites().await.unwrap();
    store.fetch_favorites().await.unwrap();

    assert_eq!(api.count("get_favorite_properties"), 2);
    assert_eq!(store.snapshot().favorites.len(), 1);
    assert!(!store.snapshot().favorites_loading);
  }

  #[tokio::test]
  async fn test_fetch_favorites_noop_for_guests_and_providers() {
    let (store, api, _) = harness(FakeApi::new(), guest());
    store.fetch_favorites().await.unwrap();
    assert!(api.calls().is_empty());

    let (store, api, _) = harness(FakeApi::new(), provider());
    store.fetch_favorites().await.unwrap();
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn test_fetch_favorites_failure_sets_error() {
    let api = FakeApi::new();
    api.fail("get_favorite_properties");
    let (store, api, _) = harness(api, seeker());

    assert!(store.fetch_favorites().await.is_err());
    assert!(store.snapshot().error.is_some());

    // A failed fetch does not start the window
    api.succeed("get_favorite_properties");
    store.fetch_favorites().await.unwrap();
    assert_eq!(api.count("get_favorite_properties"), 2);
  }

  #[tokio::test]
  async fn test_failed_add_keeps_earlier_provisional_entry() {
    let api = FakeApi::new();
    api.fail("add_to_favorites");
    let (store, _, _) = loaded(api).await;
    let earlier = Favorite::provisional(Property::new("P1", "Loft"), Utc::now());
    store.update(|state| state.favorites = vec![earlier.clone()]);

    assert!(store
      .add_to_favorites(&PropertyId::new("P1"))
      .await
      .is_err());
    assert_eq!(store.snapshot().favorites, vec![earlier]);
  }

  #[tokio::test]
  async fn test_failed_add_removes_only_its_own_placeholder() {
    let api = FakeApi::new();
    api.fail("add_to_favorites");
    let (store, _, _) = loaded(api).await;
    let earlier = Favorite::provisional(Property::new("P2", "Flat"), Utc::now());
    store.update(|state| state.favorites = vec![earlier.clone()]);

    assert!(store
      .add_to_favorites(&PropertyId::new("P1"))
      .await
      .is_err());
    assert_eq!(store.snapshot().favorites, vec![earlier]);
  }

  #[tokio::test]
  async fn test_toggle_adds_confirmed_favorite() {
    let (store, _, notifier) = loaded(FakeApi::new()).await;
    let id = PropertyId::new("P1");

    assert!(store.toggle_favorite(&id).await.unwrap());
    let state = store.snapshot();
    assert_eq!(state.favorites.len(), 1);
    assert_eq!(state.favorites[0].id.as_str(), "502");
    assert_eq!(notifier.last().unwrap().0, "Property added to favorites");

    // Toggling an already present favorite on keeps a single entry
    store.toggle_favorite(&id).await.unwrap();
    assert_eq!(store.snapshot().favorites.len(), 1);
  }

  #[tokio::test]
  async fn test_toggle_off_removes_favorite() {
    let api = FakeApi::new().with_toggle_reply(ToggleFavoriteResponse {
      favorited: false,
      message: None,
      favorite_id: None,
    });
    let (store, _, notifier) = loaded(api).await;
    store.update(|state| {
      state.favorites = vec![stored_favorite("1", "P1"), stored_favorite("2", "P2")]
    });

    assert!(!store.toggle_favorite(&PropertyId::new("P1")).await.unwrap());

    let state = store.snapshot();
    assert_eq!(state.favorites, vec![stored_favorite("2", "P2")]);
    assert_eq!(notifier.last().unwrap().0, "Removed from favorites");
  }

  #[tokio::test]
  async fn test_toggle_without_server_id_refetches_favorites() {
    let api = FakeApi::new()
      .with_favorites(vec![stored_favorite("1", "P2")])
      .with_toggle_reply(ToggleFavoriteResponse {
        favorited: true,
        message: None,
        favorite_id: None,
      });
    let (store, api, notifier) = loaded(api).await;
    store.fetch_favorites().await.unwrap();
    let id = PropertyId::new("P1");

    assert!(store.toggle_favorite(&id).await.unwrap());

    let state = store.snapshot();
    assert_eq!(state.favorites.len(), 2);
    assert!(state.favorites[0].refers_to(&id));
    assert!(state.favorites[0].id.is_provisional());
    assert_eq!(state.favorites[0].property.as_ref().unwrap().title, "Loft");
    assert_eq!(notifier.last().unwrap().0, "Added to favorites");

    // The window was reset, so the next fetch goes to the server
    store.fetch_favorites().await.unwrap();
    assert_eq!(api.count("get_favorite_properties"), 2);
    assert_eq!(store.snapshot().favorites, vec![stored_favorite("1", "P2")]);
  }

  #[tokio::test]
  async fn test_favorite_status() {
    let api = FakeApi::new().with_favorites(vec![stored_favorite("1", "P1")]);
    let (store, _, _) = harness(api, seeker());
    assert!(store.favorite_status(&PropertyId::new("P1")).await.unwrap());
    assert!(!store.favorite_status(&PropertyId::new("P2")).await.unwrap());

    let (store, api, _) = harness(FakeApi::new(), guest());
    assert!(!store.favorite_status(&PropertyId::new("P1")).await.unwrap());
    assert!(api.calls().is_empty());
  }
}
