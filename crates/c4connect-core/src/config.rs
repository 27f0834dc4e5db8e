//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the last used login, the request timeout and optional
//! overrides of the provider base URLs.
//!
//! Configuration is stored at `~/.config/c4connect/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::endpoints::{Endpoints, ACCOUNT_BASE_URL, SITE_BASE_URL};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "c4connect";

/// Config file name
const CONFIG_FILE: &str = "config.json";

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            last_login: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            site_base_url: None,
            account_base_url: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Provider endpoints, with any configured base URL overrides applied.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            self.site_base_url.as_deref().unwrap_or(SITE_BASE_URL),
            self.account_base_url.as_deref().unwrap_or(ACCOUNT_BASE_URL),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"last_login":"alice@example.com"}"#).unwrap();
        assert_eq!(config.last_login.as_deref(), Some("alice@example.com"));
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.endpoints().account_base_url, ACCOUNT_BASE_URL);
    }

    #[test]
    fn test_endpoint_overrides() {
        let config = Config {
            site_base_url: Some("http://localhost:9000".to_string()),
            account_base_url: Some("http://localhost:9001/".to_string()),
            ..Config::default()
        };
        let endpoints = config.endpoints();
        assert_eq!(endpoints.site_base_url, "http://localhost:9000");
        assert_eq!(endpoints.account_base_url, "http://localhost:9001");
    }

    #[test]
    fn test_overrides_not_serialized_when_unset() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(!json.contains("base_url"));
    }
}
