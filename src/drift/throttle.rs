//! Per-host spacing of request starts

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Keeps request starts to the same host at least `interval` apart.
///
/// Each caller reserves the next free start time under the lock and sleeps
/// after releasing it, so waiting on one host never blocks another.
#[derive(Debug)]
pub struct HostThrottle {
    interval: Duration,
    next_start: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_start: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a request to `url`'s host may start
    pub async fn wait(&self, url: &Url) {
        if self.interval.is_zero() {
            return;
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

        let start_at = {
            let mut next_start = self.next_start.lock().await;
            let now = Instant::now();
            // Reservations in the past no longer constrain anything
            next_start.retain(|_, reserved| *reserved > now);
            let start_at = next_start
                .get(&host)
                .copied()
                .filter(|reserved| *reserved > now)
                .unwrap_or(now);
            next_start.insert(host, start_at + self.interval);
            start_at
        };

        tokio::time::sleep_until(start_at).await;
    }
}
