use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db;

/// Environment variable that forces offline mode when set to a truthy value.
pub const OFFLINE_ENV: &str = "RESTODIR_OFFLINE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub feed: FeedConfig,
  #[serde(default)]
  pub site: SiteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
  /// Endpoint returning the full restaurant list as a JSON array
  pub url: String,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:1337/restaurants".to_string(),
      timeout_secs: 30,
    }
  }
}

impl FeedConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
  /// Origin the application shell is served from
  pub origin: String,
}

impl Default for SiteConfig {
  fn default() -> Self {
    Self {
      origin: "http://localhost:8000".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, records are never persisted and offline reads are empty
  pub enabled: bool,
  /// Overrides the platform data directory
  pub data_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      data_dir: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
  /// Version tag installed when none is given on the command line
  pub version: String,
  /// Shell resource paths pre-cached on install
  pub shell: Vec<String>,
  /// URL prefixes of third-party map tile servers
  pub tile_prefixes: Vec<String>,
  /// Widths offered for responsive restaurant images
  pub image_widths: Vec<u32>,
}

impl Default for AssetsConfig {
  fn default() -> Self {
    Self {
      version: "v1".to_string(),
      shell: ["/", "/index.html", "/restaurant.html", "/css/styles.css", "/js/main.js"]
        .into_iter()
        .map(String::from)
        .collect(),
      tile_prefixes: vec!["https://maps.googleapis.com/maps/vt".to_string()],
      image_widths: vec![250, 800],
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./restodir.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/restodir/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("restodir.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("restodir").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Directory holding the record and asset databases and the log file.
  pub fn data_dir(&self) -> Result<PathBuf> {
    match &self.cache.data_dir {
      Some(dir) => Ok(dir.clone()),
      None => db::default_data_dir().map_err(|e| eyre!("{}", e)),
    }
  }

  /// Whether the environment forces offline mode.
  ///
  /// Checks RESTODIR_OFFLINE for `1`, `true` or `yes`.
  pub fn offline_from_env() -> bool {
    std::env::var(OFFLINE_ENV)
      .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
      .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_sections_use_defaults() {
    let config = Config::parse("feed:\n  url: http://example.com/r\n").unwrap();

    assert_eq!(config.feed.url, "http://example.com/r");
    assert_eq!(config.feed.timeout_secs, 30);
    assert_eq!(config.site.origin, "http://localhost:8000");
    assert!(config.cache.enabled);
    assert_eq!(config.assets.version, "v1");
    assert_eq!(config.assets.shell.len(), 5);
    assert_eq!(config.assets.image_widths, vec![250, 800]);
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::parse("  \n").unwrap();
    assert_eq!(config.feed.url, "http://localhost:1337/restaurants");
  }

  #[test]
  fn test_full_file() {
    let yaml = r#"
feed:
  url: http://api.local/restaurants
  timeout_secs: 5
site:
  origin: https://resto.example
cache:
  enabled: false
  data_dir: /tmp/restodir-test
assets:
  version: v7
  shell: ["/", "/index.html"]
  tile_prefixes: []
  image_widths: [400]
"#;
    let config = Config::parse(yaml).unwrap();

    assert_eq!(config.feed.timeout(), Duration::from_secs(5));
    assert_eq!(config.site.origin, "https://resto.example");
    assert!(!config.cache.enabled);
    assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/restodir-test"));
    assert_eq!(config.assets.version, "v7");
    assert_eq!(config.assets.shell, vec!["/", "/index.html"]);
    assert!(config.assets.tile_prefixes.is_empty());
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    assert!(Config::parse("feed: [unclosed").is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restodir.yaml");
    std::fs::write(&path, "site:\n  origin: http://127.0.0.1:9000\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.site.origin, "http://127.0.0.1:9000");
  }
}
