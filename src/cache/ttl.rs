//! Time-boxed cache entries.

use chrono::{DateTime, Duration, Utc};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Default cache window.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  cached_at: DateTime<Utc>,
}

/// Map whose entries expire a fixed duration after they were written.
///
/// An entry is valid while `now - cached_at < ttl`; expired entries are misses
/// and are dropped on lookup.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
  entries: HashMap<K, CacheEntry<V>>,
  ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: HashMap::new(),
      ttl,
    }
  }

  fn is_stale(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at >= self.ttl
  }

  /// Fresh value and the time it was cached.
  pub fn get<Q>(&mut self, key: &Q, now: DateTime<Utc>) -> Option<(V, DateTime<Utc>)>
  where
    K: Borrow<Q>,
    Q: Eq + Hash + ?Sized,
  {
    let entry = self.entries.get(key)?;
    if self.is_stale(entry.cached_at, now) {
      self.entries.remove(key);
      return None;
    }
    Some((entry.value.clone(), entry.cached_at))
  }

  pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
    self.entries.insert(
      key,
      CacheEntry {
        value,
        cached_at: now,
      },
    );
  }
}

/// Time of the last successful fetch of something that has no key, such as
/// the favorites list.
#[derive(Debug, Clone, Copy)]
pub struct FetchStamp {
  last: Option<DateTime<Utc>>,
  ttl: Duration,
}

impl FetchStamp {
  pub fn new(ttl: Duration) -> Self {
    Self { last: None, ttl }
  }

  /// True while the last fetch is still inside the cache window.
  pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
    self.last.map(|t| now - t < self.ttl).unwrap_or(false)
  }

  pub fn touch(&mut self, now: DateTime<Utc>) {
    self.last = Some(now);
  }

  pub fn reset(&mut self) {
    self.last = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  #[test]
  fn test_entry_valid_inside_window() {
    let mut cache = TtlCache::new(Duration::seconds(300));
    cache.insert("k".to_string(), 1, at(0));

    assert_eq!(cache.get("k", at(299)), Some((1, at(0))));
  }

  #[test]
  fn test_entry_expires_at_window_end() {
    let mut cache = TtlCache::new(Duration::seconds(300));
    cache.insert("k".to_string(), 1, at(0));

    assert_eq!(cache.get("k", at(300)), None);
    // Dropped on the expired lookup, so an earlier clock no longer finds it
    assert_eq!(cache.get("k", at(0)), None);
  }

  #[test]
  fn test_fetch_stamp() {
    let mut stamp = FetchStamp::new(Duration::seconds(300));
    assert!(!stamp.is_fresh(at(0)));

    stamp.touch(at(0));
    assert!(stamp.is_fresh(at(10)));
    assert!(!stamp.is_fresh(at(301)));

    stamp.reset();
    assert!(!stamp.is_fresh(at(10)));
  }
}
