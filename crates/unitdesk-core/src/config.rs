//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: the
//! backend URL, request timeout and cache TTL.
//!
//! Configuration is stored at `~/.config/unitdesk/config.json`. The backend
//! URL and bearer token can be overridden with `UNITDESK_API_URL` and
//! `UNITDESK_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::api::ApiConfig;
use crate::cache::DEFAULT_TTL;

/// Application name used for the config directory path
const APP_NAME: &str = "unitdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "UNITDESK_API_URL";

/// Environment variable supplying the bearer token
pub const TOKEN_ENV: &str = "UNITDESK_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }
        Ok(config)
    }

    /// Load only what is stored on disk, without environment overrides.
    /// Use this when the result is going to be saved back.
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Write the config file, returning where it was written
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Connection settings for the API client. The token only ever comes
    /// from the environment; it is never written to the config file.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            token: std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            ..ApiConfig::default()
        }
    }
}
