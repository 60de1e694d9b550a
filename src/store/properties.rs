//! Property listing reads and provider mutations.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::images::apply_cached_images;
use super::{Flag, PropertyStore};
use crate::api::PropertyPage;
use crate::cache::{CacheResult, PropertyFilters, DEFAULT_SORT_FIELD};
use crate::error::StoreError;
use crate::models::{
  AvailabilityStatus, Property, PropertyDraft, PropertyId, ProviderAnalytics, Role,
};

impl PropertyStore {
  /// Fetch a page of properties, serving it from cache while the entry is
  /// inside the cache window.
  ///
  /// Page 1 (or no page) replaces `properties`; later pages are appended
  /// without de-duplication. A cache hit always replaces, whatever the page.
  pub async fn fetch_properties(
    &self,
    filters: &PropertyFilters,
    force_refresh: bool,
  ) -> Result<CacheResult<PropertyPage>, StoreError> {
    filters.validate().map_err(StoreError::Validation)?;

    let _busy = self.busy(Flag::Properties);
    let signature = filters.signature();
    let now = Utc::now();

    if !force_refresh {
      let hit = self.lock().caches.pages.get(&signature, now);
      if let Some((page, cached_at)) = hit {
        debug!(signature = %signature, "Properties served from cache");
        self.update_shared(|shared| {
          shared.state.properties = page.properties.clone();
          apply_cached_images(shared, &page.properties);
        });
        return Ok(CacheResult::from_cache(page, cached_at));
      }
    }

    let api = &self.inner.api;
    let result = if filters.needs_search() {
      debug!(signature = %signature, "Searching properties");
      api.search_properties(filters).await
    } else {
      let sort_by = filters.sort_by.as_deref().unwrap_or(DEFAULT_SORT_FIELD);
      api
        .get_properties(
          filters.effective_page(),
          filters.effective_size(),
          sort_by,
          filters.sort_direction.unwrap_or_default(),
        )
        .await
    };

    let page = match result {
      Ok(page) => page,
      Err(e) => {
        error!("Fetch properties error: {}", e);
        return Err(self.fail(e.into(), false));
      }
    };

    let replace = filters.is_first_page();
    self.update_shared(|shared| {
      shared.caches.pages.insert(signature, page.clone(), now);
      if replace {
        shared.state.properties = page.properties.clone();
      } else {
        shared
          .state
          .properties
          .extend(page.properties.iter().cloned());
      }
    });

    self.spawn_image_resolution(page.properties.clone());
    Ok(CacheResult::from_network(page))
  }

  /// Single property straight from the backend. State is left untouched and
  /// failures are only logged.
  pub async fn get_property_by_id(&self, id: &PropertyId) -> Option<Property> {
    let _busy = self.busy(Flag::Loading);
    match self.inner.api.get_property(id).await {
      Ok(property) => Some(property),
      Err(e) => {
        warn!(%id, "Error getting property by id: {}", e);
        None
      }
    }
  }

  /// Create a listing as the signed-in provider.
  pub async fn add_property(
    &self,
    mut draft: PropertyDraft,
    images: Vec<String>,
  ) -> Result<Property, StoreError> {
    self.require_role(
      Role::Provider,
      "Please login to add properties",
      "Only providers can add properties",
    )?;
    draft.attach_images(images);
    draft.validate().map_err(StoreError::Validation)?;

    let _busy = self.busy(Flag::Loading);
    let created = match self.inner.api.create_property(&draft).await {
      Ok(property) => property.with_pending_images(),
      Err(e) => return Err(self.fail(e.into(), true)),
    };

    self.update(|state| {
      state.properties.insert(0, created.clone());
      state.my_properties.insert(0, created.clone());
      state.my_property_count += 1;
    });
    info!(id = %created.id, "Property created");

    self.spawn_image_resolution(vec![created.clone()]);
    self.toast("Property added successfully");
    Ok(created)
  }

  /// Update a listing and swap the result into every list that holds it.
  pub async fn update_property(
    &self,
    id: &PropertyId,
    mut draft: PropertyDraft,
    images: Vec<String>,
  ) -> Result<Property, StoreError> {
    self.require_login("Please login to update properties")?;
    draft.attach_images(images);
    draft.validate().map_err(StoreError::Validation)?;

    let _busy = self.busy(Flag::Loading);
    let updated = match self.inner.api.update_property(id, &draft).await {
      Ok(property) => property.with_pending_images(),
      Err(e) => return Err(self.fail(e.into(), true)),
    };

    self.update(|state| state.replace_property(&updated));
    info!(%id, "Property updated");

    self.spawn_image_resolution(vec![updated.clone()]);
    self.toast("Property updated successfully");
    Ok(updated)
  }

  /// Change availability. `status` must be one of the backend's values;
  /// anything else fails before a request is made.
  pub async fn update_property_status(
    &self,
    id: &PropertyId,
    status: &str,
  ) -> Result<Property, StoreError> {
    self.require_login("Please login to update property status")?;
    let status: AvailabilityStatus = status.parse().map_err(StoreError::Validation)?;

    let _busy = self.busy(Flag::StatusChange);
    let updated = match self.inner.api.update_property_status(id, status).await {
      Ok(property) => property.with_pending_images(),
      Err(e) => return Err(self.fail(e.into(), true)),
    };

    self.update(|state| state.replace_property(&updated));
    info!(%id, %status, "Property status updated");

    // Restores cached image URLs on the replaced entries
    self.spawn_image_resolution(vec![updated.clone()]);
    self.toast(&format!("Property status updated to {}", status.label()));
    Ok(updated)
  }

  /// Delete a listing. Local lists only change once the server confirms.
  pub async fn delete_property(&self, id: &PropertyId) -> Result<(), StoreError> {
    self.require_login("Please login to delete properties")?;

    let _busy = self.busy(Flag::Loading);
    if let Err(e) = self.inner.api.delete_property(id).await {
      return Err(self.fail(e.into(), true));
    }

    self.update(|state| {
      state.remove_property(id);
      state.my_property_count = state.my_property_count.saturating_sub(1);
    });
    info!(%id, "Property deleted");

    self.toast("Property deleted successfully");
    Ok(())
  }

  /// Refresh the provider's listing count. Other sessions keep the current
  /// value without a request.
  pub async fn fetch_my_property_count(&self) -> Result<u64, StoreError> {
    if !self.acting_as(Role::Provider) {
      return Ok(self.snapshot().my_property_count);
    }

    match self.inner.api.get_my_property_count().await {
      Ok(count) => {
        self.update(|state| state.my_property_count = count);
        Ok(count)
      }
      Err(e) => {
        error!("Failed to fetch property count: {}", e);
        Err(self.fail(e.into(), false))
      }
    }
  }

  pub async fn fetch_provider_analytics(&self) -> Result<ProviderAnalytics, StoreError> {
    self.require_role(
      Role::Provider,
      "Please login to view analytics",
      "Only providers can view analytics",
    )?;

    let _busy = self.busy(Flag::Loading);
    self
      .inner
      .api
      .get_provider_analytics()
      .await
      .map_err(|e| self.fail(e.into(), false))
  }
}
