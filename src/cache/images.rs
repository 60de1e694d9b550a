//! Resolved image URLs, keyed by the canonical image id set.

use std::collections::HashMap;

/// Identical id sets always resolve to identical URLs, so entries never expire.
#[derive(Debug, Clone, Default)]
pub struct ImageUrlCache {
  entries: HashMap<String, HashMap<String, String>>,
}

impl ImageUrlCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&HashMap<String, String>> {
    self.entries.get(key)
  }

  pub fn insert(&mut self, key: String, urls: HashMap<String, String>) {
    self.entries.insert(key, urls);
  }
}
