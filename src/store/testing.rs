//! In-memory backend and notifier for store tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{Notifier, PropertyStore, Severity, StoreOptions};
use crate::api::{
  ApiError, ApiResult, AuthApi, FavoritePage, LoginResponse, PropertyApi, PropertyPage,
  ToggleFavoriteResponse,
};
use crate::auth::StaticSession;
use crate::cache::{PropertyFilters, SortDirection};
use crate::models::{
  Favorite, FavoriteId, ProfileUpdate, Property, PropertyDraft, PropertyId, ProviderAnalytics,
  Role, User, UserId,
};

pub const CONFIRMED_FAVORITE_ID: &str = "501";

/// Backend double that records every call by operation name and fails the
/// operations it is told to.
#[derive(Default)]
pub struct FakeApi {
  calls: Mutex<Vec<String>>,
  failing: Mutex<HashSet<&'static str>>,
  pages: Mutex<HashMap<u32, Vec<Property>>>,
  favorites: Mutex<Vec<Favorite>>,
  broken_images: Mutex<HashSet<String>>,
  toggle_reply: Mutex<Option<ToggleFavoriteResponse>>,
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_page(self, page: u32, properties: Vec<Property>) -> Self {
    lock(&self.pages).insert(page, properties);
    self
  }

  pub fn with_favorites(self, favorites: Vec<Favorite>) -> Self {
    *lock(&self.favorites) = favorites;
    self
  }

  /// Answer every toggle with `reply` instead of a confirmed add.
  pub fn with_toggle_reply(self, reply: ToggleFavoriteResponse) -> Self {
    *lock(&self.toggle_reply) = Some(reply);
    self
  }

  pub fn fail(&self, operation: &'static str) {
    lock(&self.failing).insert(operation);
  }

  pub fn succeed(&self, operation: &'static str) {
    lock(&self.failing).remove(operation);
  }

  /// URL requests containing this image id fail.
  pub fn break_image(&self, image_id: &str) {
    lock(&self.broken_images).insert(image_id.to_string());
  }

  pub fn calls(&self) -> Vec<String> {
    lock(&self.calls).clone()
  }

  pub fn count(&self, operation: &str) -> usize {
    lock(&self.calls).iter().filter(|c| *c == operation).count()
  }

  fn record(&self, operation: &'static str) -> ApiResult<()> {
    lock(&self.calls).push(operation.to_string());
    if lock(&self.failing).contains(operation) {
      return Err(ApiError::Rejected {
        status: 500,
        message: format!("{} failed", operation),
      });
    }
    Ok(())
  }

  fn find(&self, id: &PropertyId) -> Option<Property> {
    lock(&self.pages)
      .values()
      .flatten()
      .find(|p| p.id == *id)
      .cloned()
  }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
  mutex.lock().unwrap()
}

fn apply_draft(property: &mut Property, draft: &PropertyDraft) {
  if let Some(title) = &draft.title {
    property.title = title.clone();
  }
  if let Some(availability) = draft.availability {
    property.availability = availability;
  }
  if let Some(ids) = &draft.image_ids {
    property.image_ids = ids.clone();
  }
  if draft.minimum_price.is_some() {
    property.minimum_price = draft.minimum_price;
  }
  if draft.maximum_price.is_some() {
    property.maximum_price = draft.maximum_price;
  }
}

#[async_trait]
impl PropertyApi for FakeApi {
  async fn create_property(&self, draft: &PropertyDraft) -> ApiResult<Property> {
    self.record("create_property")?;
    let mut property = Property::new("NEW1", "");
    apply_draft(&mut property, draft);
    Ok(property)
  }

  async fn get_properties(
    &self,
    page: u32,
    _size: u32,
    _sort_by: &str,
    _sort_direction: SortDirection,
  ) -> ApiResult<PropertyPage> {
    self.record("get_properties")?;
    let properties: Vec<Property> = lock(&self.pages)
      .get(&page)
      .cloned()
      .unwrap_or_default()
      .into_iter()
      .map(Property::with_pending_images)
      .collect();
    Ok(PropertyPage {
      total_elements: properties.len() as u64,
      properties,
      total_pages: Some(1),
      current_page: Some(page),
    })
  }

  async fn search_properties(&self, criteria: &PropertyFilters) -> ApiResult<PropertyPage> {
    self.record("search_properties")?;
    let needle = criteria.search.clone().unwrap_or_default().to_lowercase();
    let properties: Vec<Property> = lock(&self.pages)
      .values()
      .flatten()
      .filter(|p| p.title.to_lowercase().contains(&needle))
      .cloned()
      .map(Property::with_pending_images)
      .collect();
    Ok(PropertyPage {
      total_elements: properties.len() as u64,
      properties,
      total_pages: None,
      current_page: None,
    })
  }

  async fn get_property(&self, id: &PropertyId) -> ApiResult<Property> {
    self.record("get_property")?;
    self.find(id).ok_or(ApiError::Rejected {
      status: 404,
      message: "Not found.".to_string(),
    })
  }

  async fn update_property(&self, id: &PropertyId, draft: &PropertyDraft) -> ApiResult<Property> {
    self.record("update_property")?;
    let mut property = self.find(id).unwrap_or_else(|| Property::new(id.clone(), ""));
    apply_draft(&mut property, draft);
    Ok(property)
  }

  async fn delete_property(&self, _id: &PropertyId) -> ApiResult<()> {
    self.record("delete_property")
  }

  async fn get_provider_analytics(&self) -> ApiResult<ProviderAnalytics> {
    self.record("get_provider_analytics")?;
    Ok(ProviderAnalytics {
      total_properties: 3,
      total_views: 120,
      ..Default::default()
    })
  }

  async fn get_my_property_count(&self) -> ApiResult<u64> {
    self.record("get_my_property_count")?;
    Ok(3)
  }

  async fn generate_property_image_urls(
    &self,
    image_ids: &[String],
  ) -> ApiResult<HashMap<String, String>> {
    self.record("generate_property_image_urls")?;
    let broken = lock(&self.broken_images);
    if image_ids.iter().any(|id| broken.contains(id)) {
      return Err(ApiError::Rejected {
        status: 500,
        message: "Image service unavailable".to_string(),
      });
    }
    Ok(
      image_ids
        .iter()
        .map(|id| (id.clone(), format!("https://cdn.test/{}", id)))
        .collect(),
    )
  }

  async fn add_to_favorites(&self, id: &PropertyId) -> ApiResult<Favorite> {
    self.record("add_to_favorites")?;
    Ok(Favorite {
      id: FavoriteId::new(CONFIRMED_FAVORITE_ID),
      property_id: id.clone(),
      property: None,
      created_at: Some(Utc::now()),
    })
  }

  async fn remove_from_favorites(&self, _id: &PropertyId) -> ApiResult<()> {
    self.record("remove_from_favorites")
  }

  async fn toggle_favorite(&self, _id: &PropertyId) -> ApiResult<ToggleFavoriteResponse> {
    self.record("toggle_favorite")?;
    let scripted = lock(&self.toggle_reply).clone();
    Ok(scripted.unwrap_or_else(|| ToggleFavoriteResponse {
      favorited: true,
      message: Some("Property added to favorites".to_string()),
      favorite_id: Some(FavoriteId::new("502")),
    }))
  }

  async fn get_favorite_status(&self, id: &PropertyId) -> ApiResult<bool> {
    self.record("get_favorite_status")?;
    Ok(lock(&self.favorites).iter().any(|f| f.refers_to(id)))
  }

  async fn get_favorite_properties(&self, _page: u32, _size: u32) -> ApiResult<FavoritePage> {
    self.record("get_favorite_properties")?;
    let favorites = lock(&self.favorites).clone();
    Ok(FavoritePage {
      total_elements: favorites.len() as u64,
      favorites,
    })
  }
}

#[async_trait]
impl AuthApi for FakeApi {
  async fn login(&self, _email: &str, _password: &str) -> ApiResult<LoginResponse> {
    self.record("login")?;
    Ok(LoginResponse {
      access: Some("access".to_string()),
      refresh: Some("refresh".to_string()),
      user: Some(user(Role::Seeker)),
    })
  }

  async fn logout(&self) -> ApiResult<()> {
    self.record("logout")
  }

  async fn validate_token(&self) -> ApiResult<User> {
    self.record("validate_token")?;
    Ok(user(Role::Seeker))
  }

  async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
    self.record("update_profile")?;
    let mut updated = user(Role::Seeker);
    if let Some(name) = &update.name {
      updated.name = name.clone();
    }
    if let Some(email) = &update.email {
      updated.email = email.clone();
    }
    Ok(updated)
  }
}

/// Notifier that keeps every toast.
#[derive(Default)]
pub struct RecordingNotifier {
  toasts: Mutex<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
  pub fn toasts(&self) -> Vec<(String, Severity)> {
    lock(&self.toasts).clone()
  }

  pub fn last(&self) -> Option<(String, Severity)> {
    lock(&self.toasts).last().cloned()
  }
}

impl Notifier for RecordingNotifier {
  fn show_toast(&self, message: &str, severity: Severity) {
    lock(&self.toasts).push((message.to_string(), severity));
  }
}

pub fn user(role: Role) -> User {
  User {
    id: UserId::new("u1"),
    name: "Test".to_string(),
    email: "test@example.com".to_string(),
    role,
  }
}

pub fn seeker() -> StaticSession {
  StaticSession::signed_in(user(Role::Seeker))
}

pub fn provider() -> StaticSession {
  StaticSession::signed_in(user(Role::Provider))
}

pub fn guest() -> StaticSession {
  StaticSession::guest()
}

pub fn harness(
  api: FakeApi,
  session: StaticSession,
) -> (PropertyStore, Arc<FakeApi>, Arc<RecordingNotifier>) {
  harness_with(api, session, StoreOptions::default())
}

pub fn harness_with(
  api: FakeApi,
  session: StaticSession,
  options: StoreOptions,
) -> (PropertyStore, Arc<FakeApi>, Arc<RecordingNotifier>) {
  let api = Arc::new(api);
  let notifier = Arc::new(RecordingNotifier::default());
  let store = PropertyStore::with_options(
    api.clone(),
    Arc::new(session),
    notifier.clone(),
    options,
  );
  (store, api, notifier)
}
