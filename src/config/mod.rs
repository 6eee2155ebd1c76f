use serde::Deserialize;

use crate::feed::{DEFAULT_FEED_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Complete camwatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CamwatchConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub poller: PollerConfig,
}

/// Feed endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Per-request timeout; timeouts belong to the fetch layer, not the core
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Poll cadence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Poll interval in milliseconds; the first poll fires immediately
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    20_000
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for CamwatchConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            poller: PollerConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<CamwatchConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: CamwatchConfig = toml::from_str(&contents)?;
    Ok(config)
}
