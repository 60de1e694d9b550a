//! Serde-deserializable types matching the backend's REST responses.
//!
//! These types are separate from domain types so the backend's shape quirks
//! (paginated vs plain arrays, nested vs bare ids) stay out of the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Favorite, FavoriteId, Property, PropertyId, User};

// ============================================================================
// Pagination
// ============================================================================

/// Django REST list responses are either paginated or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiList<T> {
  Page {
    #[serde(default)]
    count: Option<u64>,
    results: Vec<T>,
  },
  Plain(Vec<T>),
}

impl<T> ApiList<T> {
  /// Items plus the server's total count, if it sent one.
  pub fn into_parts(self) -> (Vec<T>, Option<u64>) {
    match self {
      Self::Page { count, results } => (results, count),
      Self::Plain(items) => (items, None),
    }
  }
}

/// One page of properties as the store consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPage {
  pub properties: Vec<Property>,
  pub total_elements: u64,
  pub total_pages: Option<u32>,
  pub current_page: Option<u32>,
}

impl PropertyPage {
  /// Page from a list endpoint response. Every image starts out pending.
  pub fn from_list(list: ApiList<Property>, page: u32, size: u32) -> Self {
    let (items, count) = list.into_parts();
    let properties: Vec<Property> = items
      .into_iter()
      .map(Property::with_pending_images)
      .collect();
    let total_elements = count.unwrap_or(properties.len() as u64);
    let total_pages = match count {
      Some(count) if size > 0 => Some(count.div_ceil(u64::from(size)) as u32),
      _ => Some(1),
    };
    Self {
      properties,
      total_elements,
      total_pages,
      current_page: Some(page),
    }
  }

  /// Page from the search endpoint, which returns a bare array.
  pub fn from_search(list: ApiList<Property>) -> Self {
    let (items, _) = list.into_parts();
    let properties: Vec<Property> = items
      .into_iter()
      .map(Property::with_pending_images)
      .collect();
    Self {
      total_elements: properties.len() as u64,
      properties,
      total_pages: None,
      current_page: None,
    }
  }
}

// ============================================================================
// Favorites
// ============================================================================

/// `property` is nested in favorite listings and a bare id elsewhere.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPropertyRef {
  Full(Box<Property>),
  Id(PropertyId),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFavorite {
  pub id: FavoriteId,
  pub property: ApiPropertyRef,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl ApiFavorite {
  pub fn into_favorite(self) -> Favorite {
    let (property_id, property) = match self.property {
      ApiPropertyRef::Full(property) => (property.id.clone(), Some(*property)),
      ApiPropertyRef::Id(id) => (id, None),
    };
    Favorite {
      id: self.id,
      property_id,
      property,
      created_at: self.created_at,
    }
  }
}

/// One page of favorites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritePage {
  pub favorites: Vec<Favorite>,
  pub total_elements: u64,
}

impl From<ApiList<ApiFavorite>> for FavoritePage {
  fn from(list: ApiList<ApiFavorite>) -> Self {
    let (items, count) = list.into_parts();
    let favorites: Vec<Favorite> = items.into_iter().map(ApiFavorite::into_favorite).collect();
    Self {
      total_elements: count.unwrap_or(favorites.len() as u64),
      favorites,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToggleFavoriteResponse {
  pub favorited: bool,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub favorite_id: Option<FavoriteId>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteStatusResponse {
  #[serde(default)]
  pub favorited: bool,
}

// ============================================================================
// Images
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrlsRequest<'a> {
  pub image_ids: &'a [String],
  pub folder: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageUrlsResponse {
  #[serde(default)]
  pub data: ImageUrlsData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrlsData {
  #[serde(default)]
  pub image_urls: HashMap<String, String>,
}

// ============================================================================
// Auth and counts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  #[serde(default)]
  pub access: Option<String>,
  #[serde(default)]
  pub refresh: Option<String>,
  #[serde(default)]
  pub user: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
  #[serde(default)]
  pub user: Option<User>,
}

/// Count endpoints answer with a bare number or `{ "count": n }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiCount {
  Bare(u64),
  Wrapped { count: u64 },
}

impl From<ApiCount> for u64 {
  fn from(count: ApiCount) -> Self {
    match count {
      ApiCount::Bare(n) | ApiCount::Wrapped { count: n } => n,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_paginated_list_page() {
    let body = json!({
      "count": 25,
      "results": [{ "id": "A", "title": "One", "imageIds": ["i1"] }]
    });
    let list: ApiList<Property> = serde_json::from_value(body).unwrap();
    let page = PropertyPage::from_list(list, 2, 10);

    assert_eq!(page.total_elements, 25);
    assert_eq!(page.total_pages, Some(3));
    assert_eq!(page.current_page, Some(2));
    assert!(page.properties[0].images_loading);
    assert!(page.properties[0].image_states["i1"].loading);
  }

  #[test]
  fn test_plain_array_search() {
    let body = json!([{ "id": "A", "title": "One" }, { "id": "B", "title": "Two" }]);
    let list: ApiList<Property> = serde_json::from_value(body).unwrap();
    let page = PropertyPage::from_search(list);
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.total_pages, None);
  }

  #[test]
  fn test_favorite_with_nested_property() {
    let body = json!({
      "id": "FAV0000000000001",
      "user": 3,
      "user_name": "Asha",
      "property": { "id": "P1", "title": "Loft", "minimumPrice": "900.00" },
      "createdAt": "2024-02-02T08:00:00Z"
    });
    let favorite = serde_json::from_value::<ApiFavorite>(body)
      .unwrap()
      .into_favorite();
    assert_eq!(favorite.property_id, PropertyId::new("P1"));
    assert_eq!(favorite.property.unwrap().title, "Loft");
  }

  #[test]
  fn test_favorite_with_bare_property_id() {
    let body = json!({ "id": 5, "property": "P9" });
    let favorite = serde_json::from_value::<ApiFavorite>(body)
      .unwrap()
      .into_favorite();
    assert_eq!(favorite.id, FavoriteId::new("5"));
    assert_eq!(favorite.property_id, PropertyId::new("P9"));
    assert!(favorite.property.is_none());
  }

  #[test]
  fn test_count_shapes() {
    let bare: ApiCount = serde_json::from_value(json!(4)).unwrap();
    let wrapped: ApiCount = serde_json::from_value(json!({ "count": 4 })).unwrap();
    assert_eq!(u64::from(bare), 4);
    assert_eq!(u64::from(wrapped), 4);
  }
}
