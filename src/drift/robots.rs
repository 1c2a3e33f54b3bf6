//! robots.txt permission gate
//!
//! Fetches `<origin>/robots.txt` once per origin and answers whether a user
//! agent may fetch a URL. A missing robots.txt (any non-success status)
//! allows everything; an unreachable one allows nothing.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

use crate::config::{FetchSettings, RobotsConfig};

#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("Failed to build robots.txt client: {0}")]
    Client(String),
    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },
}

/// Rules from one robots.txt that apply to one user agent
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow_patterns: Vec<String>,
    allow_patterns: Vec<String>,
}

impl RobotsRules {
    /// Parse robots.txt content for `user_agent`.
    ///
    /// Groups naming our product token (case-insensitive, whole token) replace
    /// the `*` group entirely.
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let mut rules = Self::default();
        let token = product_token(user_agent);

        let mut current_group_applies = false;
        let mut found_specific_agent = false;
        // Consecutive User-agent lines form one group
        let mut in_agent_lines = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            if directive == "user-agent" {
                let agent = value.to_ascii_lowercase();
                let applies = if agent == "*" {
                    !found_specific_agent
                } else if !token.is_empty() && product_token(&agent) == token {
                    if !found_specific_agent {
                        // Specific rules replace anything collected under `*`
                        rules = Self::default();
                        found_specific_agent = true;
                    }
                    true
                } else {
                    false
                };
                current_group_applies = if in_agent_lines {
                    current_group_applies || applies
                } else {
                    applies
                };
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if !current_group_applies {
                continue;
            }
            match directive.as_str() {
                "disallow" if !value.is_empty() => rules.disallow_patterns.push(value.to_string()),
                "allow" if !value.is_empty() => rules.allow_patterns.push(value.to_string()),
                _ => {}
            }
        }

        rules
    }

    /// Rules that allow everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check a path (with query, if any) against the rules.
    /// The longest matching pattern wins; on a tie, allow wins.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path_matches(path, p))
                .map(|p| p.len())
                .max()
                .unwrap_or(0)
        };
        longest(&self.allow_patterns) >= longest(&self.disallow_patterns)
    }
}

/// `pagedrift/0.1 (+https://...)` -> `pagedrift`
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Check if a path matches a robots.txt pattern (`*` wildcards, `$` anchor)
fn path_matches(path: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let (pattern, must_end_match) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        let last = parts.len() - 1;
        let mut pos = 0;

        for (i, part) in parts.iter().enumerate() {
            if i == last && must_end_match {
                // Anchored tail binds to the end of the path, not its first occurrence
                return path[pos..].ends_with(part);
            }
            if part.is_empty() {
                continue;
            }
            match path[pos..].find(part) {
                Some(found) => {
                    if i == 0 && found != 0 {
                        // First part must match at start
                        return false;
                    }
                    pos += found + part.len();
                }
                None => return false,
            }
        }

        return true;
    }

    if must_end_match {
        return path == pattern;
    }
    path.starts_with(pattern)
}

/// What fetching a robots.txt produced
#[derive(Debug, Clone)]
enum RobotsBody {
    Fetched(String),
    /// Non-success status: no restrictions
    Missing,
    /// Transport failure: treated as not allowed
    Unreachable,
}

/// Cached robots.txt lookups keyed by origin
pub struct RobotsGate {
    client: reqwest::Client,
    cache: Mutex<LruCache<String, RobotsBody>>,
    user_agent: String,
    timeout: Duration,
}

impl RobotsGate {
    pub fn new(config: &RobotsConfig, settings: &FetchSettings) -> Result<Self, RobotsError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| RobotsError::Client(e.to_string()))?;
        Ok(Self::with_client(client, config, &settings.user_agent))
    }

    pub fn with_client(client: reqwest::Client, config: &RobotsConfig, user_agent: &str) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            cache: Mutex::new(LruCache::new(capacity)),
            user_agent: user_agent.to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }

    /// [`is_allowed`](Self::is_allowed) for the configured user agent
    pub async fn check(&self, url: &Url) -> bool {
        self.is_allowed(url, &self.user_agent).await
    }

    /// Whether `user_agent` may fetch `url`
    pub async fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        let origin = url.origin().ascii_serialization();
        match self.body_for(&origin).await {
            RobotsBody::Fetched(content) => {
                let rules = RobotsRules::parse(&content, user_agent);
                rules.is_allowed(&request_path(url))
            }
            RobotsBody::Missing => true,
            RobotsBody::Unreachable => false,
        }
    }

    async fn body_for(&self, origin: &str) -> RobotsBody {
        if let Some(body) = self.cache.lock().await.get(origin) {
            return body.clone();
        }

        let robots_url = format!("{}/robots.txt", origin);
        let body = match self.fetch_robots(&robots_url).await {
            Ok(Some(content)) => RobotsBody::Fetched(content),
            Ok(None) => {
                tracing::info!("No robots.txt at {}, assuming fetching is allowed", robots_url);
                RobotsBody::Missing
            }
            Err(e) => {
                tracing::warn!("{}; treating as disallowed", e);
                RobotsBody::Unreachable
            }
        };

        self.cache.lock().await.put(origin.to_string(), body.clone());
        body
    }

    /// Body of a successful response, `None` for any other status
    async fn fetch_robots(&self, robots_url: &str) -> Result<Option<String>, RobotsError> {
        let transport = |e: reqwest::Error| RobotsError::Transport {
            url: robots_url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(robots_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Ok(None);
        }
        response.text().await.map(Some).map_err(transport)
    }
}

/// Path plus query, as matched against robots.txt patterns
fn request_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_robots_parsing() {
        let content = r#"
User-agent: *
Disallow: /private/
Allow: /private/public/
Crawl-delay: 2

User-agent: pagedrift
Disallow: /admin/
Crawl-delay: 1
"#;

        let rules = RobotsRules::parse(content, "pagedrift/0.1");

        // Specific group replaces the wildcard one
        assert!(rules.is_allowed("/public/page.html"));
        assert!(!rules.is_allowed("/admin/settings"));
        assert!(rules.is_allowed("/private/test"));

        let other = RobotsRules::parse(content, "OtherBot");
        assert!(!other.is_allowed("/private/test"));
        assert!(other.is_allowed("/private/public/x"));
    }

    #[test]
    fn test_robots_wildcard() {
        let content = r#"
User-agent: *
Disallow: /private/
Disallow: /*.pdf$
Allow: /private/readme.txt
"#;

        let rules = RobotsRules::parse(content, "TestBot");

        assert!(rules.is_allowed("/public/page.html"));
        assert!(!rules.is_allowed("/private/secret"));
        assert!(rules.is_allowed("/private/readme.txt"));
        assert!(!rules.is_allowed("/docs/manual.pdf"));
        assert!(rules.is_allowed("/docs/manual.html"));
        assert!(!rules.is_allowed("/a.pdf/b.pdf"));
        assert!(rules.is_allowed("/a.pdf/b.html"));
    }

    #[test]
    fn test_agent_group_needs_whole_token() {
        let content = "User-agent: a\nDisallow: /\n\nUser-agent: page\nDisallow: /\n\nUser-agent: *\nAllow: /\n";
        let rules = RobotsRules::parse(content, "pagedrift/0.1");
        assert!(rules.is_allowed("/anything"));

        let named = "User-agent: PageDrift/2.0\nDisallow: /\n\nUser-agent: *\nAllow: /\n";
        assert!(!RobotsRules::parse(named, "pagedrift/0.1").is_allowed("/anything"));
    }

    #[test]
    fn test_grouped_user_agents_and_comments() {
        let content = "User-agent: foo\nUser-agent: pagedrift # us\nDisallow: /x # no\n";
        let rules = RobotsRules::parse(content, "pagedrift");
        assert!(!rules.is_allowed("/x/y"));
        assert!(rules.is_allowed("/y"));
    }

    #[test]
    fn test_empty_disallow_allows_all() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n", "pagedrift");
        assert!(rules.is_allowed("/anything"));
        assert!(RobotsRules::allow_all().is_allowed("/"));
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/admin/test", "/admin/"));
        assert!(!path_matches("/public/test", "/admin/"));

        assert!(path_matches("/images/cat.jpg", "/images/*.jpg"));

        assert!(path_matches("/page.html", "/page.html$"));
        assert!(!path_matches("/page.html?query", "/page.html$"));

        assert!(path_matches("/x/a.pdf/b.pdf", "/*.pdf$"));
        assert!(!path_matches("/x/a.pdf?v=2", "/*.pdf$"));
        assert!(path_matches("/docs/anything", "/docs/*$"));
        assert!(path_matches("/a/b/c.js", "/*/b/*.js$"));
    }

    #[test]
    fn test_request_path_includes_query() {
        let url = Url::parse("https://a.test/search?q=1").unwrap();
        assert_eq!(request_path(&url), "/search?q=1");
    }

    /// Serve `status` + `body` for every connection, counting requests
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}", addr), hits)
    }

    fn gate() -> RobotsGate {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        RobotsGate::with_client(client, &RobotsConfig::default(), "pagedrift/0.1")
    }

    #[tokio::test]
    async fn test_gate_applies_rules_and_caches() {
        let (base, hits) = serve("200 OK", "User-agent: *\nDisallow: /private\n").await;
        let gate = gate();

        let public = Url::parse(&format!("{}/public", base)).unwrap();
        let private = Url::parse(&format!("{}/private/page", base)).unwrap();
        assert!(gate.check(&public).await);
        assert!(!gate.check(&private).await);
        assert!(!gate.is_allowed(&private, "SomeOtherBot").await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gate_missing_robots_allows() {
        let (base, _) = serve("404 Not Found", "nope").await;
        let url = Url::parse(&format!("{}/anything", base)).unwrap();
        assert!(gate().check(&url).await);
    }

    #[tokio::test]
    async fn test_gate_unreachable_disallows() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/page", addr)).unwrap();
        assert!(!gate().check(&url).await);
    }
}
