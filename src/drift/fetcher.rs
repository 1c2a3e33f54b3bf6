//! Fetch engine for drift checks
//!
//! Two interchangeable page sources sit behind the [`PageSource`] trait:
//! - [`HttpSource`]: plain HTTP GET (reqwest)
//! - [`HeadlessSource`](super::render::HeadlessSource): headless browser render
//!
//! [`FetchEngine`] wraps a source with the retry policy: a fixed number of
//! attempts, each bounded by a timeout, separated by a constant backoff.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use super::throttle::HostThrottle;
use crate::config::{CheckConfig, FetchSettings};
use crate::types::{Backend, FetchAttempt, Observation, ObservationIndex};
use crate::util::truncate_str;

/// Errors that can occur during a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error, timeout at the transport level, or non-success status
    #[error("Transient fetch error: {0}")]
    Transient(String),
    /// Headless backend failure
    #[error("Render error: {0}")]
    Render(String),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transient(e.to_string())
    }
}

/// Extra engine-side allowance for sources that time themselves out
/// (covers browser launch and shutdown)
pub const SELF_TIMED_GRACE: Duration = Duration::from_secs(20);

/// A way of retrieving a page's raw markup
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Backend tag recorded on every attempt
    fn backend(&self) -> Backend;

    /// Whether `fetch_page` applies `timeout` itself and cleans up afterwards.
    ///
    /// Such sources get [`SELF_TIMED_GRACE`] on top of the engine's deadline
    /// so their own cleanup runs before the attempt future is dropped.
    fn enforces_timeout(&self) -> bool {
        false
    }

    /// Fetch raw content once. `timeout` bounds the attempt.
    async fn fetch_page(&self, url: &Url, timeout: Duration) -> Result<String, FetchError>;
}

/// Plain HTTP page source
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(&settings.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shared with the robots gate)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpSource {
    fn backend(&self) -> Backend {
        Backend::Http
    }

    async fn fetch_page(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP status {}", status)));
        }

        Ok(response.text().await?)
    }
}

/// Retry policy for one observation
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Per-attempt deadline
    pub timeout: Duration,
    /// Attempt budget (at least 1)
    pub max_retries: u32,
    /// Constant delay between attempts
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl FetchPolicy {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries.max(1),
            backoff: config.retry_backoff(),
        }
    }
}

/// Page source plus retry policy
#[derive(Clone)]
pub struct FetchEngine {
    source: Arc<dyn PageSource>,
    policy: FetchPolicy,
    throttle: Option<Arc<HostThrottle>>,
}

impl FetchEngine {
    pub fn new(source: Arc<dyn PageSource>, policy: FetchPolicy) -> Self {
        Self {
            source,
            policy,
            throttle: None,
        }
    }

    /// Space every attempt's start through `throttle`
    pub fn with_throttle(mut self, throttle: Arc<HostThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn backend(&self) -> Backend {
        self.source.backend()
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch `url` for one observation.
    ///
    /// Returns as soon as an attempt succeeds. When every attempt fails the
    /// observation ends with a failed attempt carrying no content; that is an
    /// ordinary outcome, not an error.
    pub async fn fetch(&self, url: &Url, index: ObservationIndex) -> Observation {
        self.fetch_until(url, index, None).await
    }

    /// [`fetch`](Self::fetch) bounded by an overall `deadline`: attempt
    /// timeouts shrink to the time left and no attempt starts after it.
    pub async fn fetch_until(
        &self,
        url: &Url,
        index: ObservationIndex,
        deadline: Option<Instant>,
    ) -> Observation {
        let backend = self.source.backend();
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt in 1..=max_attempts {
            if let Some(throttle) = &self.throttle {
                throttle.wait(url).await;
            }

            let mut attempt_timeout = self.policy.timeout;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!(
                        "Deadline reached for {} ({} observation) before attempt {}/{}",
                        url,
                        index,
                        attempt,
                        max_attempts
                    );
                    attempts.push(FetchAttempt::failure(
                        url.as_str(),
                        backend,
                        attempt,
                        "deadline exceeded",
                    ));
                    break;
                }
                attempt_timeout = attempt_timeout.min(remaining);
            }
            let outer_timeout = if self.source.enforces_timeout() {
                attempt_timeout + SELF_TIMED_GRACE
            } else {
                attempt_timeout
            };

            let fetch = self.source.fetch_page(url, attempt_timeout);
            let result = match tokio::time::timeout(outer_timeout, fetch).await {
                Ok(inner) => inner,
                Err(_) => Err(FetchError::Timeout(outer_timeout)),
            };

            match result {
                Ok(body) => {
                    tracing::debug!(
                        "Fetched {} ({} observation, attempt {}/{}, {} bytes)",
                        url,
                        index,
                        attempt,
                        max_attempts,
                        body.len()
                    );
                    attempts.push(FetchAttempt::success(url.as_str(), backend, attempt, body));
                    return Observation::new(index, attempts);
                }
                Err(e) => {
                    let message = truncate_str(&e.to_string(), 200);
                    tracing::warn!(
                        "Error fetching {} ({} observation): {}. Attempt {}/{}",
                        url,
                        index,
                        message,
                        attempt,
                        max_attempts
                    );
                    attempts.push(FetchAttempt::failure(url.as_str(), backend, attempt, message));
                }
            }

            if attempt < max_attempts && !self.policy.backoff.is_zero() {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        tracing::warn!(
            "Failed to fetch {} ({} observation) after {} attempts",
            url,
            index,
            attempts.len()
        );
        Observation::new(index, attempts)
    }
}
