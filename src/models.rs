//! Domain types shared by the API client, the property store and the history store.
//!
//! Field names follow the backend's camelCase JSON so the same types round-trip
//! through the REST API and through local storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Favorite ids above this value are client-generated millisecond timestamps,
/// not database ids.
pub const PROVISIONAL_ID_THRESHOLD: u64 = 1_000_000_000_000;

// ============================================================================
// Identifiers
// ============================================================================

/// Backend ids arrive as strings or numbers; both are kept as their string form.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
    Uint(u64),
  }

  Ok(match Raw::deserialize(deserializer)? {
    Raw::Text(s) => s,
    Raw::Int(n) => n.to_string(),
    Raw::Uint(n) => n.to_string(),
  })
}

macro_rules! opaque_id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(#[serde(deserialize_with = "opaque_id")] String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self {
        Self(id.to_string())
      }
    }

    impl From<String> for $name {
      fn from(id: String) -> Self {
        Self(id)
      }
    }
  };
}

opaque_id_type!(
  /// Identifier of a listed property.
  PropertyId
);
opaque_id_type!(
  /// Identifier of an account.
  UserId
);
opaque_id_type!(
  /// Identifier of a favorite, either server-assigned or a provisional timestamp.
  FavoriteId
);

impl FavoriteId {
  /// Temporary id for a favorite that the server has not confirmed yet.
  pub fn provisional(now: DateTime<Utc>) -> Self {
    Self(now.timestamp_millis().to_string())
  }

  /// True when the id looks like a client timestamp rather than a database id.
  pub fn is_provisional(&self) -> bool {
    self
      .0
      .parse::<u64>()
      .map(|n| n > PROVISIONAL_ID_THRESHOLD)
      .unwrap_or(false)
  }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Availability of a listed property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvailabilityStatus {
  #[default]
  Available,
  Occupied,
  Maintenance,
  #[serde(rename = "Coming_Soon")]
  ComingSoon,
}

impl AvailabilityStatus {
  pub const ALL: [AvailabilityStatus; 4] = [
    AvailabilityStatus::Available,
    AvailabilityStatus::Occupied,
    AvailabilityStatus::Maintenance,
    AvailabilityStatus::ComingSoon,
  ];

  /// Wire value as the backend expects it.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Available => "Available",
      Self::Occupied => "Occupied",
      Self::Maintenance => "Maintenance",
      Self::ComingSoon => "Coming_Soon",
    }
  }

  /// Human-readable label for notifications.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Available => "Available Now",
      Self::Occupied => "Currently Occupied",
      Self::Maintenance => "Under Maintenance",
      Self::ComingSoon => "Available Soon",
    }
  }
}

impl fmt::Display for AvailabilityStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AvailabilityStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| {
        let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
        format!("Invalid status. Must be one of: {}", valid.join(", "))
      })
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FurnishingStatus {
  Fully,
  Semi,
  #[default]
  Unfurnished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
  Rent,
  Sale,
}

impl FromStr for ListingKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "rent" => Ok(Self::Rent),
      "sale" => Ok(Self::Sale),
      other => Err(format!("Unknown listing kind: {}", other)),
    }
  }
}

/// Account role. Guests have no role at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[serde(alias = "PROVIDER", alias = "Provider")]
  Provider,
  #[serde(alias = "SEEKER", alias = "Seeker")]
  Seeker,
}

// ============================================================================
// Records
// ============================================================================

/// The signed-in account as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: UserId,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub role: Role,
}

/// Resolution state of a single property image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLoadState {
  pub loading: bool,
  pub url: Option<String>,
  pub error: Option<String>,
}

impl ImageLoadState {
  pub fn pending() -> Self {
    Self {
      loading: true,
      url: None,
      error: None,
    }
  }

  pub fn resolved(url: String) -> Self {
    Self {
      loading: false,
      url: Some(url),
      error: None,
    }
  }

  pub fn failed(reason: impl Into<String>) -> Self {
    Self {
      loading: false,
      url: None,
      error: Some(reason.into()),
    }
  }
}

/// Django serializes decimals as strings; accept either form.
fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(f64),
    Text(String),
  }

  match Option::<Raw>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Raw::Number(n)) => Ok(Some(n)),
    Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
    Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
  }
}

/// A listed property.
///
/// `image_urls`, `image_states` and `images_loading` are client-side and filled
/// in by image resolution after the property arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
  pub id: PropertyId,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, rename = "type")]
  pub property_type: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub listing_type: Option<ListingKind>,
  #[serde(default, deserialize_with = "decimal")]
  pub minimum_price: Option<f64>,
  #[serde(default, deserialize_with = "decimal")]
  pub maximum_price: Option<f64>,
  #[serde(default)]
  pub country: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub location: String,
  #[serde(default, deserialize_with = "decimal")]
  pub latitude: Option<f64>,
  #[serde(default, deserialize_with = "decimal")]
  pub longitude: Option<f64>,
  #[serde(default)]
  pub availability: AvailabilityStatus,
  #[serde(default)]
  pub furnishing_status: FurnishingStatus,
  #[serde(default)]
  pub amenities: BTreeSet<String>,
  #[serde(default)]
  pub image_ids: Vec<String>,
  #[serde(default)]
  pub image_urls: Vec<String>,
  #[serde(default)]
  pub image_states: BTreeMap<String, ImageLoadState>,
  #[serde(default)]
  pub images_loading: bool,
  #[serde(default)]
  pub owner: Option<UserId>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Property {
  /// Minimal property, mostly useful for tests and placeholders.
  pub fn new(id: impl Into<PropertyId>, title: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      title: title.into(),
      description: String::new(),
      property_type: String::new(),
      category: String::new(),
      listing_type: None,
      minimum_price: None,
      maximum_price: None,
      country: String::new(),
      state: String::new(),
      city: String::new(),
      location: String::new(),
      latitude: None,
      longitude: None,
      availability: AvailabilityStatus::default(),
      furnishing_status: FurnishingStatus::default(),
      amenities: BTreeSet::new(),
      image_ids: Vec::new(),
      image_urls: Vec::new(),
      image_states: BTreeMap::new(),
      images_loading: false,
      owner: None,
      created_at: None,
    }
  }

  pub fn with_images<I, S>(mut self, ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.image_ids = ids.into_iter().map(Into::into).collect();
    self
  }

  /// Mark every image as loading, as list responses do before resolution.
  pub fn with_pending_images(mut self) -> Self {
    self.image_states = self
      .image_ids
      .iter()
      .map(|id| (id.clone(), ImageLoadState::pending()))
      .collect();
    self.images_loading = !self.image_ids.is_empty();
    self
  }

  /// Key under which resolved URLs for this image set are cached.
  /// `None` when the property has no images.
  pub fn image_cache_key(&self) -> Option<String> {
    if self.image_ids.is_empty() {
      return None;
    }
    let mut ids: Vec<&str> = self.image_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    Some(ids.join(","))
  }

  /// Apply resolved URLs in image order. Ids missing from `urls` are dropped
  /// from `image_urls` and recorded as errors.
  pub fn apply_image_urls(&mut self, urls: &HashMap<String, String>) {
    self.image_urls = self
      .image_ids
      .iter()
      .filter_map(|id| urls.get(id).cloned())
      .collect();
    self.image_states = self
      .image_ids
      .iter()
      .map(|id| {
        let state = match urls.get(id) {
          Some(url) => ImageLoadState::resolved(url.clone()),
          None => ImageLoadState::failed("Image URL was not returned"),
        };
        (id.clone(), state)
      })
      .collect();
    self.images_loading = false;
  }

  pub fn mark_images_failed(&mut self, reason: &str) {
    self.image_urls.clear();
    self.image_states = self
      .image_ids
      .iter()
      .map(|id| (id.clone(), ImageLoadState::failed(reason)))
      .collect();
    self.images_loading = false;
  }
}

/// A seeker's saved property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
  pub id: FavoriteId,
  pub property_id: PropertyId,
  #[serde(default)]
  pub property: Option<Property>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Favorite {
  /// Client-side favorite inserted before the server confirms it.
  pub fn provisional(property: Property, now: DateTime<Utc>) -> Self {
    Self {
      id: FavoriteId::provisional(now),
      property_id: property.id.clone(),
      property: Some(property),
      created_at: Some(now),
    }
  }

  /// Does this favorite refer to the given property, directly or through its
  /// nested record?
  pub fn refers_to(&self, id: &PropertyId) -> bool {
    self.property_id == *id
      || self
        .property
        .as_ref()
        .map(|p| p.id == *id)
        .unwrap_or(false)
  }
}

/// Changes to the signed-in user's profile. Unset fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.email.is_none()
  }
}

/// Fields for creating or updating a property. Unset fields are omitted from
/// the request body, so the same type serves partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub property_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub room_config: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub listing_type: Option<ListingKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deposit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub minimum_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub maximum_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub area_size: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub availability: Option<AvailabilityStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub furnishing_status: Option<FurnishingStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amenities: Option<BTreeSet<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_ids: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub available_from: Option<NaiveDate>,
}

impl PropertyDraft {
  /// Append uploaded image ids to whatever the draft already carries.
  pub fn attach_images(&mut self, images: Vec<String>) {
    if images.is_empty() {
      return;
    }
    self.image_ids.get_or_insert_with(Vec::new).extend(images);
  }

  /// Local checks the backend would also reject.
  pub fn validate(&self) -> Result<(), String> {
    if let Some(min) = self.minimum_price {
      if min < 0.0 {
        return Err("Minimum price cannot be negative".to_string());
      }
    }
    if let Some(max) = self.maximum_price {
      if max < 0.0 {
        return Err("Maximum price cannot be negative".to_string());
      }
    }
    if let (Some(min), Some(max)) = (self.minimum_price, self.maximum_price) {
      if max < min {
        return Err("Maximum price cannot be less than minimum price".to_string());
      }
    }
    Ok(())
  }
}

/// Per-property numbers inside the provider dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyAnalytics {
  pub id: Option<PropertyId>,
  pub title: String,
  pub availability: Option<AvailabilityStatus>,
  pub total_views: u64,
  pub total_favorites: u64,
  pub unique_viewers: u64,
  pub views_this_week: u64,
  pub views_this_month: u64,
  pub favorites_this_week: u64,
  pub favorites_this_month: u64,
}

/// Provider dashboard summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderAnalytics {
  pub total_properties: u64,
  pub active_properties: u64,
  pub total_views: u64,
  pub total_favorites: u64,
  pub unique_viewers: u64,
  pub views_this_week: u64,
  pub views_this_month: u64,
  pub favorites_this_week: u64,
  pub favorites_this_month: u64,
  pub top_performing_properties: Vec<PropertyAnalytics>,
  pub recent_activity: Vec<serde_json::Value>,
}
