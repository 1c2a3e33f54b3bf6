//! Headless browser page source
//!
//! Each fetch launches its own Chromium instance, loads the page, waits a
//! settle delay for dynamic content, and reads back the rendered document.
//! The browser is closed on every exit path, including timeouts and errors.
//!
//! Requires the `headless` feature and a local Chrome/Chromium install.

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::fetcher::{FetchError, PageSource};
use crate::types::Backend;

/// Headless render settings
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Wait after navigation before reading the document
    pub settle_delay: Duration,
    /// User agent override for the browser
    pub user_agent: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            user_agent: None,
        }
    }
}

/// Page source rendering through a headless browser
pub struct HeadlessSource {
    config: RenderConfig,
}

impl HeadlessSource {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

#[async_trait]
impl PageSource for HeadlessSource {
    fn backend(&self) -> Backend {
        Backend::HeadlessRender
    }

    fn enforces_timeout(&self) -> bool {
        true
    }

    #[cfg(feature = "headless")]
    async fn fetch_page(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        render_with_browser(url, timeout, &self.config).await
    }

    #[cfg(not(feature = "headless"))]
    async fn fetch_page(&self, url: &Url, _timeout: Duration) -> Result<String, FetchError> {
        tracing::debug!("Headless render requested for {} without browser support", url);
        Err(FetchError::Render(
            "headless support not compiled in (enable the `headless` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "headless")]
async fn render_with_browser(
    url: &Url,
    timeout: Duration,
    config: &RenderConfig,
) -> Result<String, FetchError> {
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;

    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage");
    if let Some(ua) = &config.user_agent {
        builder = builder.arg(format!("--user-agent={}", ua));
    }
    let browser_config = builder
        .build()
        .map_err(|e| FetchError::Render(format!("Browser config error: {}", e)))?;

    let (mut browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| FetchError::Render(format!("Failed to launch browser: {}", e)))?;

    let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let settle = config.settle_delay;
    let render = async {
        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| FetchError::Render(format!("Failed to open page: {}", e)))?;
        tokio::time::sleep(settle).await;
        page.content()
            .await
            .map_err(|e| FetchError::Render(format!("Failed to read page content: {}", e)))
    };

    // Navigation and settle delay share the attempt deadline
    let result = match tokio::time::timeout(timeout, render).await {
        Ok(inner) => inner,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };

    if let Err(e) = browser.close().await {
        tracing::debug!("Browser close for {} failed: {}", url, e);
    }
    if let Err(e) = browser.wait().await {
        tracing::debug!("Browser wait for {} failed: {}", url, e);
    }
    handler_task.abort();

    result
}
