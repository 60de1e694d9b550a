use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_SECS;
use crate::store::{StoreOptions, DEFAULT_FAVORITES_PAGE_SIZE};

const API_URL_ENV: &str = "HAVEN_API_URL";
const PASSWORD_ENV: &str = "HAVEN_PASSWORD";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Backend root, e.g. "http://10.0.0.5:8000"
  pub base_url: String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
  DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long list results and the favorites fetch stay fresh
  #[serde(default = "default_ttl")]
  pub ttl_secs: u64,
  #[serde(default = "default_favorites_page_size")]
  pub favorites_page_size: u32,
}

fn default_ttl() -> u64 {
  DEFAULT_TTL_SECS as u64
}

fn default_favorites_page_size() -> u32 {
  DEFAULT_FAVORITES_PAGE_SIZE
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl(),
      favorites_page_size: default_favorites_page_size(),
    }
  }
}

impl CacheConfig {
  pub fn store_options(&self) -> StoreOptions {
    // chrono durations top out at i64::MAX milliseconds
    let ttl = i64::try_from(self.ttl_secs)
      .unwrap_or(i64::MAX)
      .min(i64::MAX / 1000);
    StoreOptions::default()
      .with_cache_duration(chrono::Duration::seconds(ttl))
      .with_favorites_page_size(self.favorites_page_size)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file (defaults to <data_dir>/haven/haven.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log file directory (defaults to <data_dir>/haven/logs)
  pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./haven.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/haven/config.yaml
  ///
  /// Without a file, HAVEN_API_URL alone is enough to run with defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let env_url = std::env::var(API_URL_ENV).ok();
    let config = match (path, env_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/haven/config.yaml\n\
                 or set {} to the backend URL.",
          API_URL_ENV
        ))
      }
    };

    Ok(config.with_env_url(env_url))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("haven.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("haven").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.validate()?;
    Ok(config)
  }

  /// Defaults for everything but the backend URL.
  pub fn with_base_url(url: &str) -> Self {
    Self {
      api: ApiConfig {
        base_url: url.to_string(),
        timeout_secs: DEFAULT_TIMEOUT_SECS,
      },
      cache: CacheConfig::default(),
      storage: StorageConfig::default(),
      log: LogConfig::default(),
    }
  }

  fn with_env_url(mut self, url: Option<String>) -> Self {
    if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    self
  }

  fn validate(&self) -> Result<()> {
    if self.api.base_url.trim().is_empty() {
      return Err(eyre!("api.base_url must not be empty"));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than 0"));
    }
    Ok(())
  }

  /// Get the account password from the environment.
  ///
  /// Checks HAVEN_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var(PASSWORD_ENV)
      .map_err(|_| eyre!("Password not found. Set {} environment variable.", PASSWORD_ENV))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  base_url: http://localhost:8000\n").unwrap();
    assert_eq!(config.api.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.cache.favorites_page_size, 100);
    assert_eq!(config.log.level, "info");
    assert!(config.storage.path.is_none());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: "http://10.0.0.5:8000"
  timeout_secs: 10
cache:
  ttl_secs: 60
  favorites_page_size: 50
storage:
  path: "/tmp/haven.db"
log:
  level: "haven=debug"
  directory: "/tmp/haven-logs"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/haven.db")));
    assert_eq!(config.log.level, "haven=debug");

    let options = config.cache.store_options();
    assert_eq!(options.cache_ttl, chrono::Duration::seconds(60));
    assert_eq!(options.favorites_page_size, 50);
  }

  #[test]
  fn test_rejects_missing_or_empty_url() {
    assert!(Config::from_yaml("cache:\n  ttl_secs: 1\n").is_err());
    assert!(Config::from_yaml("api:\n  base_url: \"\"\n").is_err());
    assert!(Config::from_yaml("api:\n  base_url: http://x\n  timeout_secs: 0\n").is_err());
  }

  #[test]
  fn test_env_url_overrides_file() {
    let config = Config::with_base_url("http://file").with_env_url(Some("http://env".to_string()));
    assert_eq!(config.api.base_url, "http://env");

    let config = Config::with_base_url("http://file").with_env_url(Some("  ".to_string()));
    assert_eq!(config.api.base_url, "http://file");
  }
}
