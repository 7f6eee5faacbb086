//! Client configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default bound on each validate/refresh request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the token authority
    pub base_url: String,
    /// Timeout for each validate/refresh request
    pub request_timeout_ms: u64,
    /// Where to persist the token; in memory only when unset
    pub cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7300".to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_path: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(toml::de::Error),
    InvalidUrl(url::ParseError),
    Http(reqwest::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::InvalidUrl(e) => write!(f, "Invalid base URL: {}", e),
            ConfigError::Http(e) => write!(f, "Failed to build HTTP client: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(ConfigError::InvalidUrl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
