//! Drift check, fetch, and robots.txt configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DEFAULT_USER_AGENT;

/// Drift check policy: retries, timing, classification, and concurrency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Per-attempt fetch deadline (seconds)
    pub timeout_secs: u64,
    /// Attempt budget per observation
    pub max_retries: u32,
    /// Constant delay between attempts (milliseconds)
    pub retry_backoff_ms: u64,
    /// Headless render wait for dynamic content (seconds)
    pub settle_delay_secs: u64,
    /// Inclusive lower bound of the similarity ratio for `Similar`
    pub similarity_threshold: f64,
    /// Number of URLs checked in parallel
    pub concurrency: usize,
    /// Minimum interval between request starts to the same host (milliseconds)
    pub per_host_interval_ms: u64,
    /// Pause between the first and second observation of a URL (milliseconds)
    pub observation_interval_ms: u64,
    /// Overall budget for both observations of one URL (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_deadline_secs: Option<u64>,
    /// Use the headless browser backend instead of plain HTTP
    pub headless: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            retry_backoff_ms: 2000,
            settle_delay_secs: 2,
            similarity_threshold: 0.9,
            concurrency: 4,
            per_host_interval_ms: 0,
            observation_interval_ms: 0,
            url_deadline_secs: None,
            headless: false,
        }
    }
}

impl CheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn per_host_interval(&self) -> Duration {
        Duration::from_millis(self.per_host_interval_ms)
    }

    pub fn observation_interval(&self) -> Duration {
        Duration::from_millis(self.observation_interval_ms)
    }

    pub fn url_deadline(&self) -> Option<Duration> {
        self.url_deadline_secs.map(Duration::from_secs)
    }
}

/// HTTP client settings shared by the page fetcher and the robots gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// User agent string sent with every request and matched against robots.txt
    pub user_agent: String,
    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// robots.txt gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    /// Consult robots.txt before fetching a URL
    pub enabled: bool,
    /// Timeout for fetching robots.txt (seconds)
    pub timeout_secs: u64,
    /// Number of hosts whose rules are cached
    pub cache_size: usize,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 5,
            cache_size: 1024,
        }
    }
}
