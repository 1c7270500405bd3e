use crate::models::flags::{FeatureFlagSet, merge};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// API host used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default timeout for a single HTTP request, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application configuration from `prostokit.yaml` and the environment
///
/// Every section falls back to its defaults, so an empty or missing file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub flags: FlagSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the API host, e.g. `https://api.prostokit.ru`
    pub base_url: String,

    /// Per-request timeout; a timed out request counts as a transport failure
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiSettings {
    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Local overrides for the built-in flag defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSettings {
    pub defaults: IndexMap<String, bool>,
}

impl FlagSettings {
    /// Built-in defaults with the configured overrides applied on top
    pub fn default_set(&self) -> FeatureFlagSet {
        let overrides = FeatureFlagSet::from(self.defaults.clone());
        merge(&FeatureFlagSet::defaults(), &overrides)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "prostokit".to_string(),
            debug: false,
            console: true,
        }
    }
}
