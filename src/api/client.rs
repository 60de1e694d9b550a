use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{
  ApiCount, ApiFavorite, ApiList, FavoriteStatusResponse, ImageUrlsRequest, ImageUrlsResponse,
  LoginRequest, LoginResponse, PropertyPage, ToggleFavoriteResponse, UserEnvelope,
};
use super::error::{normalize, ApiError, LOGIN_PATH};
use super::{ApiResult, AuthApi, FavoritePage, PropertyApi};
use crate::auth::TokenStore;
use crate::cache::{PropertyFilters, SortDirection};
use crate::config::ApiConfig;
use crate::models::{
  Favorite, ProfileUpdate, Property, PropertyDraft, PropertyId, ProviderAnalytics, User,
};

const IMAGE_FOLDER: &str = "images";

/// Backend REST client
#[derive(Clone)]
pub struct RestClient {
  http: reqwest::Client,
  base_url: Url,
  tokens: Arc<TokenStore>,
}

impl RestClient {
  pub fn new(config: &ApiConfig, tokens: Arc<TokenStore>) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("haven/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      tokens,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Send a request and decode the JSON response, normalizing every failure.
  async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &[(String, String)],
    body: Option<&Value>,
  ) -> ApiResult<T> {
    let url = self.base_url.join(path).map_err(|e| {
      warn!("Invalid request path {}: {}", path, e);
      ApiError::Network
    })?;

    debug!(%method, path, "API request");

    let mut request = self.http.request(method.clone(), url);
    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(token) = self.tokens.token() {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => {
        warn!(%method, path, timeout = e.is_timeout(), connect = e.is_connect(), "Network error: {}", e);
        return Err(normalize(path, None, None));
      }
    };

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
      warn!(%method, path, "Failed to read response body: {}", e);
      ApiError::Network
    })?;

    if !status.is_success() {
      let body: Option<Value> = serde_json::from_slice(&bytes).ok();
      let error = normalize(path, Some(status.as_u16()), body.as_ref());
      if error == ApiError::SessionExpired {
        self.tokens.clear_auth_data();
      }
      warn!(%method, path, status = status.as_u16(), "API error: {}", error);
      return Err(error);
    }

    let value: Value = if bytes.is_empty() || status == StatusCode::NO_CONTENT {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))?
    };

    serde_json::from_value(value).map_err(|e| {
      warn!(%method, path, "Failed to decode response: {}", e);
      ApiError::Decode(e.to_string())
    })
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> ApiResult<T> {
    self.request(Method::GET, path, query, None).await
  }

  async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<&Value>) -> ApiResult<T> {
    self.request(Method::POST, path, &[], body).await
  }

  async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> ApiResult<T> {
    self.request(Method::PUT, path, &[], Some(body)).await
  }

  async fn delete(&self, path: &str) -> ApiResult<()> {
    self
      .request::<Value>(Method::DELETE, path, &[], None)
      .await
      .map(|_| ())
  }
}

fn to_body<T: serde::Serialize>(value: &T) -> ApiResult<Value> {
  serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn ordering(sort_by: &str, direction: SortDirection) -> String {
  match direction {
    SortDirection::Desc => format!("-{}", sort_by),
    SortDirection::Asc => sort_by.to_string(),
  }
}

#[async_trait]
impl PropertyApi for RestClient {
  async fn create_property(&self, draft: &PropertyDraft) -> ApiResult<Property> {
    let body = to_body(draft)?;
    self.post("/api/properties/create/", Some(&body)).await
  }

  async fn get_properties(
    &self,
    page: u32,
    size: u32,
    sort_by: &str,
    sort_direction: SortDirection,
  ) -> ApiResult<PropertyPage> {
    let query = vec![
      ("page".to_string(), page.to_string()),
      ("page_size".to_string(), size.to_string()),
      ("ordering".to_string(), ordering(sort_by, sort_direction)),
    ];
    let list: ApiList<Property> = self.get("/api/properties/", &query).await?;
    Ok(PropertyPage::from_list(list, page, size))
  }

  async fn search_properties(&self, criteria: &PropertyFilters) -> ApiResult<PropertyPage> {
    let query: Vec<(String, String)> = criteria.entries().into_iter().collect();
    let list: ApiList<Property> = self.get("/api/properties/search/", &query).await?;
    Ok(PropertyPage::from_search(list))
  }

  async fn get_property(&self, id: &PropertyId) -> ApiResult<Property> {
    self.get(&format!("/api/properties/{}/", id), &[]).await
  }

  async fn update_property(&self, id: &PropertyId, draft: &PropertyDraft) -> ApiResult<Property> {
    let body = to_body(draft)?;
    self
      .put(&format!("/api/properties/{}/update/", id), &body)
      .await
  }

  async fn delete_property(&self, id: &PropertyId) -> ApiResult<()> {
    self
      .delete(&format!("/api/properties/{}/delete/", id))
      .await
  }

  async fn get_provider_analytics(&self) -> ApiResult<ProviderAnalytics> {
    self.get("/api/properties/analytics/", &[]).await
  }

  async fn get_my_property_count(&self) -> ApiResult<u64> {
    let count: ApiCount = self
      .get("/api/properties/my-properties/count", &[])
      .await?;
    Ok(count.into())
  }

  async fn generate_property_image_urls(
    &self,
    image_ids: &[String],
  ) -> ApiResult<HashMap<String, String>> {
    if image_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let body = to_body(&ImageUrlsRequest {
      image_ids,
      folder: IMAGE_FOLDER,
    })?;
    let response: ImageUrlsResponse = self.post("/api/images/urls", Some(&body)).await?;
    Ok(response.data.image_urls)
  }

  async fn add_to_favorites(&self, id: &PropertyId) -> ApiResult<Favorite> {
    let favorite: ApiFavorite = self
      .post(&format!("/api/properties/{}/favorite/", id), None)
      .await?;
    Ok(favorite.into_favorite())
  }

  async fn remove_from_favorites(&self, id: &PropertyId) -> ApiResult<()> {
    self
      .delete(&format!("/api/properties/{}/unfavorite/", id))
      .await
  }

  async fn toggle_favorite(&self, id: &PropertyId) -> ApiResult<ToggleFavoriteResponse> {
    self
      .post(&format!("/api/properties/{}/toggle-favorite/", id), None)
      .await
  }

  async fn get_favorite_status(&self, id: &PropertyId) -> ApiResult<bool> {
    let status: FavoriteStatusResponse = self
      .get(&format!("/api/properties/{}/favorite-status/", id), &[])
      .await?;
    Ok(status.favorited)
  }

  async fn get_favorite_properties(&self, page: u32, size: u32) -> ApiResult<FavoritePage> {
    let query = if page >= 1 && size > 0 {
      vec![
        ("page".to_string(), page.to_string()),
        ("page_size".to_string(), size.to_string()),
      ]
    } else {
      Vec::new()
    };
    let list: ApiList<ApiFavorite> = self.get("/api/properties/favorites/", &query).await?;
    Ok(list.into())
  }
}

#[async_trait]
impl AuthApi for RestClient {
  async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
    let body = to_body(&LoginRequest { email, password })?;
    let response: LoginResponse = self.post(LOGIN_PATH, Some(&body)).await?;

    if let (Some(access), Some(refresh)) = (&response.access, &response.refresh) {
      self.tokens.set_token(access);
      self.tokens.set_refresh_token(refresh);
      if let Some(user) = &response.user {
        self.tokens.set_user(user);
      }
    }

    Ok(response)
  }

  async fn logout(&self) -> ApiResult<()> {
    if let Some(refresh) = self.tokens.refresh_token() {
      let body = json!({ "refresh": refresh });
      if let Err(e) = self
        .post::<Value>("/api/auth/logout/", Some(&body))
        .await
      {
        debug!("Backend logout failed, clearing local data anyway: {}", e);
      }
    }
    self.tokens.clear_auth_data();
    Ok(())
  }

  async fn validate_token(&self) -> ApiResult<User> {
    let result: ApiResult<UserEnvelope> = self.get("/api/auth/validate-token/", &[]).await;
    match result {
      Ok(UserEnvelope { user: Some(user) }) => {
        self.tokens.set_user(&user);
        Ok(user)
      }
      Ok(UserEnvelope { user: None }) => {
        self.tokens.clear_auth_data();
        Err(ApiError::Decode("validate-token response has no user".to_string()))
      }
      Err(e) => {
        self.tokens.clear_auth_data();
        Err(e)
      }
    }
  }

  async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
    let body = to_body(update)?;
    let envelope: UserEnvelope = self.put("/api/auth/update-user/", &body).await?;
    let user = envelope
      .user
      .ok_or_else(|| ApiError::Decode("update-user response has no user".to_string()))?;
    self.tokens.set_user(&user);
    Ok(user)
  }
}
