//! Persistent key-value storage for device-local data.
//!
//! Auth tokens, the guest flag and the history lists are all small JSON
//! documents stored under fixed keys, so a single string-to-string store
//! backs every persistent concern of the client.

mod sqlite;

pub use sqlite::SqliteStore;

use color_eyre::Result;

/// Trait for key-value storage backends.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<()>;

  /// Remove several keys at once.
  fn remove_many(&self, keys: &[&str]) -> Result<()> {
    for key in keys {
      self.remove(key)?;
    }
    Ok(())
  }
}
