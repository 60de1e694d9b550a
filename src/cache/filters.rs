//! Property query filters and their cache signatures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::{AvailabilityStatus, ListingKind};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

/// Parameters of a property list or search query.
///
/// Only the fields that are set take part in the signature and in the query
/// string, so `PropertyFilters::default()` means "first page, server defaults".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilters {
  pub page: Option<u32>,
  pub size: Option<u32>,
  pub sort_by: Option<String>,
  pub sort_direction: Option<SortDirection>,
  pub search: Option<String>,
  #[serde(rename = "type")]
  pub property_type: Option<String>,
  pub category: Option<String>,
  pub listing_type: Option<ListingKind>,
  pub availability: Option<AvailabilityStatus>,
  pub city: Option<String>,
  pub location: Option<String>,
  pub min_price: Option<f64>,
  pub max_price: Option<f64>,
  pub furnishing_status: Option<String>,
  #[serde(default)]
  pub amenities: BTreeSet<String>,
  /// Any other backend filter, e.g. `genderPreference` or `roomConfig`.
  #[serde(default)]
  pub extra: BTreeMap<String, String>,
}

impl PropertyFilters {
  pub fn page(page: u32, size: u32) -> Self {
    Self {
      page: Some(page),
      size: Some(size),
      ..Default::default()
    }
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }

  /// Page number, where unset means the first page.
  pub fn effective_page(&self) -> u32 {
    self.page.unwrap_or(1)
  }

  pub fn effective_size(&self) -> u32 {
    self.size.unwrap_or(DEFAULT_PAGE_SIZE)
  }

  /// Unset page and page 1 both replace the visible list.
  pub fn is_first_page(&self) -> bool {
    self.effective_page() == 1
  }

  /// Check the local constraints on paging.
  pub fn validate(&self) -> Result<(), String> {
    if self.page == Some(0) {
      return Err("Page must be 1 or greater".to_string());
    }
    if self.size == Some(0) {
      return Err("Page size must be greater than 0".to_string());
    }
    if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
      if min > max {
        return Err("Minimum price cannot exceed maximum price".to_string());
      }
    }
    Ok(())
  }

  /// Set fields as sorted key/value pairs. Empty strings count as unset.
  pub fn entries(&self) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
      if let Some(v) = value {
        if !v.trim().is_empty() {
          map.insert(key.to_string(), v);
        }
      }
    };

    put("page", self.page.map(|p| p.to_string()));
    put("size", self.size.map(|s| s.to_string()));
    put("sortBy", self.sort_by.clone());
    put(
      "sortDirection",
      self.sort_direction.map(|d| match d {
        SortDirection::Asc => "asc".to_string(),
        SortDirection::Desc => "desc".to_string(),
      }),
    );
    put("search", self.search.clone());
    put("type", self.property_type.clone());
    put("category", self.category.clone());
    put(
      "listingType",
      self.listing_type.map(|l| match l {
        ListingKind::Rent => "rent".to_string(),
        ListingKind::Sale => "sale".to_string(),
      }),
    );
    put("availability", self.availability.map(|a| a.as_str().to_string()));
    put("city", self.city.clone());
    put("location", self.location.clone());
    put("min_price", self.min_price.map(|p| p.to_string()));
    put("max_price", self.max_price.map(|p| p.to_string()));
    put("furnishingStatus", self.furnishing_status.clone());
    if !self.amenities.is_empty() {
      let joined: Vec<&str> = self.amenities.iter().map(String::as_str).collect();
      put("amenities", Some(joined.join(",")));
    }
    for (key, value) in &self.extra {
      put(key.as_str(), Some(value.clone()));
    }
    map
  }

  /// Search text present, or more than two filter keys set, means the query
  /// goes to the search endpoint instead of the plain list.
  pub fn needs_search(&self) -> bool {
    let has_search = self
      .search
      .as_deref()
      .map(|s| !s.trim().is_empty())
      .unwrap_or(false);
    has_search || self.entries().len() > 2
  }

  /// Canonical cache key for these filters.
  pub fn signature(&self) -> FilterSignature {
    FilterSignature::from_entries(&self.entries())
  }
}

/// Stable hash of a query's set filters.
///
/// Built from sorted keys, so two filter sets with the same contents always
/// produce the same signature regardless of how they were assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSignature(String);

impl FilterSignature {
  pub fn from_entries(entries: &BTreeMap<String, String>) -> Self {
    let canonical: Vec<String> = entries
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    let input = format!("properties:{}", canonical.join("&"));

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Self(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for FilterSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_signature_ignores_assembly_order() {
    let mut a = PropertyFilters::page(1, 20);
    a.amenities.insert("wifi".to_string());
    a.amenities.insert("parking".to_string());
    a.extra.insert("roomConfig".to_string(), "2BHK".to_string());
    a.extra.insert("genderPreference".to_string(), "Any".to_string());

    let mut b = PropertyFilters::default();
    b.extra.insert("genderPreference".to_string(), "Any".to_string());
    b.amenities.insert("parking".to_string());
    b.size = Some(20);
    b.extra.insert("roomConfig".to_string(), "2BHK".to_string());
    b.amenities.insert("wifi".to_string());
    b.page = Some(1);

    assert_eq!(a.signature(), b.signature());
  }

  #[test]
  fn test_signature_distinguishes_pages() {
    assert_ne!(
      PropertyFilters::page(1, 10).signature(),
      PropertyFilters::page(2, 10).signature()
    );
  }

  #[test]
  fn test_blank_strings_are_unset() {
    let blank = PropertyFilters {
      city: Some("  ".to_string()),
      ..Default::default()
    };
    assert_eq!(blank.signature(), PropertyFilters::default().signature());
  }

  #[test]
  fn test_search_routing() {
    assert!(!PropertyFilters::default().needs_search());
    assert!(!PropertyFilters::page(2, 20).needs_search());
    assert!(PropertyFilters::default().with_search("loft").needs_search());

    let three_keys = PropertyFilters {
      city: Some("Pune".to_string()),
      ..PropertyFilters::page(1, 20)
    };
    assert!(three_keys.needs_search());
  }

  #[test]
  fn test_validate_paging() {
    assert!(PropertyFilters::page(0, 10).validate().is_err());
    assert!(PropertyFilters::page(1, 0).validate().is_err());
    assert!(PropertyFilters::page(1, 10).validate().is_ok());
  }
}
