//! REST API access.
//!
//! [`PropertyApi`] and [`AuthApi`] are the seams the rest of the crate talks
//! to; [`RestClient`] implements both over HTTP.

pub mod api_types;
mod client;
mod error;

pub use api_types::{FavoritePage, LoginResponse, PropertyPage, ToggleFavoriteResponse};
pub use client::RestClient;
pub use error::{normalize, ApiError, LOGIN_PATH};

use async_trait::async_trait;
use std::collections::HashMap;

use crate::cache::{PropertyFilters, SortDirection};
use crate::models::{
  AvailabilityStatus, Favorite, ProfileUpdate, Property, PropertyDraft, PropertyId,
  ProviderAnalytics, User,
};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Property and favorite endpoints.
#[async_trait]
pub trait PropertyApi: Send + Sync {
  async fn create_property(&self, draft: &PropertyDraft) -> ApiResult<Property>;

  async fn get_properties(
    &self,
    page: u32,
    size: u32,
    sort_by: &str,
    sort_direction: SortDirection,
  ) -> ApiResult<PropertyPage>;

  async fn search_properties(&self, criteria: &PropertyFilters) -> ApiResult<PropertyPage>;

  async fn get_property(&self, id: &PropertyId) -> ApiResult<Property>;

  async fn update_property(&self, id: &PropertyId, draft: &PropertyDraft) -> ApiResult<Property>;

  async fn update_property_status(
    &self,
    id: &PropertyId,
    status: AvailabilityStatus,
  ) -> ApiResult<Property> {
    let draft = PropertyDraft {
      availability: Some(status),
      ..Default::default()
    };
    self.update_property(id, &draft).await
  }

  async fn delete_property(&self, id: &PropertyId) -> ApiResult<()>;

  async fn get_provider_analytics(&self) -> ApiResult<ProviderAnalytics>;

  async fn get_my_property_count(&self) -> ApiResult<u64>;

  /// Resolve image ids to URLs. Ids the server could not sign are absent
  /// from the map.
  async fn generate_property_image_urls(
    &self,
    image_ids: &[String],
  ) -> ApiResult<HashMap<String, String>>;

  async fn add_to_favorites(&self, id: &PropertyId) -> ApiResult<Favorite>;

  async fn remove_from_favorites(&self, id: &PropertyId) -> ApiResult<()>;

  async fn toggle_favorite(&self, id: &PropertyId) -> ApiResult<ToggleFavoriteResponse>;

  async fn get_favorite_status(&self, id: &PropertyId) -> ApiResult<bool>;

  async fn get_favorite_properties(&self, page: u32, size: u32) -> ApiResult<FavoritePage>;
}

/// Account endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
  /// Sign in and persist the returned tokens and user.
  async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

  /// Sign out on the server if possible; local auth data is always cleared.
  async fn logout(&self) -> ApiResult<()>;

  /// Re-read the current user, clearing auth data if the token is rejected.
  async fn validate_token(&self) -> ApiResult<User>;

  /// Save profile changes and keep the stored user in step.
  async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User>;
}
