use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

pub const API_URL_ENV: &str = "BONUS_VOTE_API_URL";
pub const TOKEN_CACHE_ENV: &str = "BONUS_VOTE_TOKEN_CACHE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Where the access token is kept between runs. No caching when unset.
    pub token_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration file")
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(TOKEN_CACHE_ENV).ok(),
        )
    }

    fn with_overrides(mut self, base_url: Option<String>, token_path: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(path) = token_path.filter(|s| !s.is_empty()) {
            self.cache.token_path = Some(PathBuf::from(path));
        }
        self
    }
}
