//! Recently visited properties and search history, kept on the device.
//!
//! Both lists are JSON arrays under a fixed key, most recent first, capped
//! and de-duplicated on insert.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::models::Property;
use crate::storage::KeyValueStore;

const RECENT_VISITS_KEY: &str = "recent_visits";
const SEARCH_HISTORY_KEY: &str = "search_history";

pub const MAX_RECENT_VISITS: usize = 50;
pub const MAX_SEARCH_HISTORY: usize = 20;

/// A property as it was when the user last opened it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVisit {
  #[serde(flatten)]
  pub property: Property,
  pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
  pub query: String,
  pub searched_at: DateTime<Utc>,
}

pub struct HistoryStore {
  storage: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
  pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
    Self { storage }
  }

  fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
    match self.storage.get(key)? {
      Some(json) => serde_json::from_str(&json).map_err(|e| eyre!("Failed to parse {}: {}", key, e)),
      None => Ok(Vec::new()),
    }
  }

  fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string(items).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
    self.storage.set(key, &json)
  }

  // ==========================================================================
  // Recent visits
  // ==========================================================================

  /// Put `property` at the head of the recent visits, replacing any earlier
  /// visit to the same property. Returns the updated list.
  pub fn add_to_recent_visits(&self, property: &Property) -> Result<Vec<RecentVisit>> {
    let mut visits: Vec<RecentVisit> = self.load(RECENT_VISITS_KEY)?;
    visits.retain(|v| v.property.id != property.id);
    visits.insert(
      0,
      RecentVisit {
        property: property.clone(),
        visited_at: Utc::now(),
      },
    );
    visits.truncate(MAX_RECENT_VISITS);

    self.save(RECENT_VISITS_KEY, &visits)?;
    debug!(id = %property.id, total = visits.len(), "Recorded recent visit");
    Ok(visits)
  }

  /// Most recent first, optionally limited.
  pub fn get_recent_visits(&self, limit: Option<usize>) -> Result<Vec<RecentVisit>> {
    let mut visits: Vec<RecentVisit> = self.load(RECENT_VISITS_KEY)?;
    if let Some(limit) = limit {
      visits.truncate(limit);
    }
    Ok(visits)
  }

  pub fn clear_recent_visits(&self) -> Result<()> {
    self.storage.remove(RECENT_VISITS_KEY)
  }

  // ==========================================================================
  // Search history
  // ==========================================================================

  /// Record a search. Blank queries are ignored and leave the history as is;
  /// an earlier search differing only in case is replaced.
  pub fn add_to_search_history(&self, query: &str) -> Result<Vec<SearchEntry>> {
    let query = query.trim();
    if query.is_empty() {
      return self.get_search_history(None);
    }

    let lowered = query.to_lowercase();
    let mut history: Vec<SearchEntry> = self.load(SEARCH_HISTORY_KEY)?;
    history.retain(|entry| entry.query.to_lowercase() != lowered);
    history.insert(
      0,
      SearchEntry {
        query: query.to_string(),
        searched_at: Utc::now(),
      },
    );
    history.truncate(MAX_SEARCH_HISTORY);

    self.save(SEARCH_HISTORY_KEY, &history)?;
    Ok(history)
  }

  pub fn get_search_history(&self, limit: Option<usize>) -> Result<Vec<SearchEntry>> {
    let mut history: Vec<SearchEntry> = self.load(SEARCH_HISTORY_KEY)?;
    if let Some(limit) = limit {
      history.truncate(limit);
    }
    Ok(history)
  }

  /// Remove one exact query.
  pub fn remove_from_search_history(&self, query: &str) -> Result<Vec<SearchEntry>> {
    let mut history: Vec<SearchEntry> = self.load(SEARCH_HISTORY_KEY)?;
    history.retain(|entry| entry.query != query);
    self.save(SEARCH_HISTORY_KEY, &history)?;
    Ok(history)
  }

  pub fn clear_search_history(&self) -> Result<()> {
    self.storage.remove(SEARCH_HISTORY_KEY)
  }
}
