//! Observable state owned by the property store.

use std::collections::HashMap;

use crate::models::{Favorite, Property, PropertyId};

/// Everything a consumer can read from the store.
///
/// Consumers receive clones through the watch channel; the store is the only
/// writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
  /// Visible list: replaced by page 1, appended to by later pages.
  pub properties: Vec<Property>,
  /// Listings owned by the signed-in provider.
  pub my_properties: Vec<Property>,
  pub favorites: Vec<Favorite>,
  pub my_property_count: u64,
  /// Add, update, delete and single-property reads.
  pub loading: bool,
  pub properties_loading: bool,
  pub favorites_loading: bool,
  pub status_change_loading: bool,
  /// Last failure reason, until `clear_error`.
  pub error: Option<String>,
}

impl StoreState {
  pub fn find_property(&self, id: &PropertyId) -> Option<&Property> {
    self.properties.iter().find(|p| p.id == *id)
  }

  pub fn is_favorite(&self, id: &PropertyId) -> bool {
    self.favorites.iter().any(|f| f.refers_to(id))
  }

  /// Every property held in any of the three lists.
  fn all_properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
    self
      .properties
      .iter_mut()
      .chain(self.my_properties.iter_mut())
      .chain(self.favorites.iter_mut().filter_map(|f| f.property.as_mut()))
  }

  /// Swap in a fresh copy of a property wherever its id appears.
  pub(crate) fn replace_property(&mut self, updated: &Property) {
    let id = &updated.id;
    for property in self
      .properties
      .iter_mut()
      .chain(self.my_properties.iter_mut())
      .filter(|p| p.id == *id)
    {
      *property = updated.clone();
    }
    for favorite in self.favorites.iter_mut().filter(|f| f.refers_to(id)) {
      favorite.property = Some(updated.clone());
    }
  }

  pub(crate) fn remove_property(&mut self, id: &PropertyId) {
    self.properties.retain(|p| p.id != *id);
    self.my_properties.retain(|p| p.id != *id);
    self.favorites.retain(|f| !f.refers_to(id));
  }

  /// Apply resolved URLs to every property whose image set has this key.
  pub(crate) fn apply_image_urls(&mut self, key: &str, urls: &HashMap<String, String>) {
    for property in self.all_properties_mut() {
      if property.image_cache_key().as_deref() == Some(key) {
        property.apply_image_urls(urls);
      }
    }
  }

  /// Record a resolution failure on the listed properties only.
  pub(crate) fn mark_images_failed(&mut self, key: &str, ids: &[PropertyId], reason: &str) {
    for property in self.all_properties_mut() {
      if ids.contains(&property.id) && property.image_cache_key().as_deref() == Some(key) {
        property.mark_images_failed(reason);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::FavoriteId;

  fn favorite_of(property: &Property) -> Favorite {
    Favorite {
      id: FavoriteId::new("7"),
      property_id: property.id.clone(),
      property: Some(property.clone()),
      created_at: None,
    }
  }

  #[test]
  fn test_replace_property_in_all_lists() {
    let original = Property::new("P1", "Old");
    let other = Property::new("P2", "Other");
    let mut state = StoreState {
      properties: vec![original.clone(), other.clone()],
      my_properties: vec![original.clone()],
      favorites: vec![favorite_of(&original), favorite_of(&other)],
      ..Default::default()
    };

    let updated = Property::new("P1", "New");
    state.replace_property(&updated);

    assert_eq!(state.properties[0].title, "New");
    assert_eq!(state.properties[1].title, "Other");
    assert_eq!(state.my_properties[0].title, "New");
    assert_eq!(state.favorites[0].property.as_ref().unwrap().title, "New");
    assert_eq!(state.favorites[1].property.as_ref().unwrap().title, "Other");
  }

  #[test]
  fn test_remove_property_from_all_lists() {
    let p = Property::new("P1", "Gone");
    let mut state = StoreState {
      properties: vec![p.clone()],
      my_properties: vec![p.clone()],
      favorites: vec![favorite_of(&p)],
      ..Default::default()
    };

    state.remove_property(&p.id);

    assert!(state.properties.is_empty());
    assert!(state.my_properties.is_empty());
    assert!(state.favorites.is_empty());
  }

  #[test]
  fn test_image_failure_only_marks_listed_ids() {
    let a = Property::new("A", "a").with_images(["x"]).with_pending_images();
    let b = Property::new("B", "b").with_images(["x"]).with_pending_images();
    let mut state = StoreState {
      properties: vec![a, b],
      ..Default::default()
    };

    state.mark_images_failed("x", &[PropertyId::new("A")], "boom");

    assert!(state.properties[0].image_states["x"].error.is_some());
    assert!(state.properties[1].image_states["x"].loading);
  }
}
