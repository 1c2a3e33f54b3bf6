//! Drift checker orchestrating the per-URL pipeline
//!
//! For each URL: robots gate, first observation, optional pause, second
//! observation, canonicalization, comparison, classification, artifacts.
//! The two observations of one URL are strictly sequential; different URLs
//! run in parallel up to the configured concurrency.

mod types;

pub use types::*;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

use super::artifacts::{ArtifactKind, ArtifactStore};
use super::canonical::Canonicalizer;
use super::classifier::{CheckState, ClassifyError, Classifier};
use super::digest::compare;
use super::fetcher::{FetchEngine, FetchError, FetchPolicy, HttpSource, PageSource};
use super::render::{HeadlessSource, RenderConfig};
use super::robots::RobotsGate;
use super::throttle::HostThrottle;
use crate::config::Config;
use crate::types::{
    CanonicalDocument, DriftReport, FetchAttempt, Observation, ObservationIndex, SiteCheckReport,
    Verdict,
};

/// Runs drift checks over a list of URLs
#[derive(Clone)]
pub struct DriftChecker {
    config: CheckerConfig,
    engine: FetchEngine,
    canonicalizer: Canonicalizer,
    classifier: Classifier,
    /// Artifact store (none disables persistence)
    artifacts: Option<ArtifactStore>,
    /// robots.txt gate (none skips the check)
    robots: Option<Arc<RobotsGate>>,
}

impl DriftChecker {
    pub fn new(engine: FetchEngine, config: CheckerConfig) -> Self {
        let classifier = Classifier::new(config.similarity_threshold);
        Self {
            config,
            engine,
            canonicalizer: Canonicalizer::default(),
            classifier,
            artifacts: None,
            robots: None,
        }
    }

    /// Build the checker described by a full configuration: HTTP or headless
    /// source, retry policy, host throttle, robots gate, artifact store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.check.headless && !cfg!(feature = "headless") {
            anyhow::bail!(
                "Headless checks need a build with the `headless` feature (cargo build --features headless)"
            );
        }

        let source: Arc<dyn PageSource> = if config.check.headless {
            Arc::new(HeadlessSource::new(RenderConfig {
                settle_delay: config.check.settle_delay(),
                user_agent: Some(config.fetch.user_agent.clone()),
            }))
        } else {
            Arc::new(
                HttpSource::new(&config.fetch)
                    .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?,
            )
        };

        let mut engine = FetchEngine::new(source, FetchPolicy::from_config(&config.check));
        if !config.check.per_host_interval().is_zero() {
            engine = engine.with_throttle(Arc::new(HostThrottle::new(
                config.check.per_host_interval(),
            )));
        }

        let mut checker = Self::new(engine, CheckerConfig::from_config(&config.check))
            .with_artifacts(ArtifactStore::new(&config.artifacts));
        if config.robots.enabled {
            checker = checker.with_robots(Arc::new(RobotsGate::new(&config.robots, &config.fetch)?));
        }
        Ok(checker)
    }

    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn with_robots(mut self, gate: Arc<RobotsGate>) -> Self {
        self.robots = Some(gate);
        self
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Canonicalizer) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check every URL, returning one entry per distinct URL in input order.
    ///
    /// Repeated URLs are checked once. A check that panics is reported as
    /// `FetchFailure(first)` so the report still covers its URL.
    pub async fn run(&self, urls: &[String]) -> DriftReport {
        let urls = dedupe_urls(urls);
        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        tracing::info!(
            "Checking {} URLs (concurrency={}, backend={})",
            urls.len(),
            concurrency,
            self.engine.backend()
        );

        for (slot, url) in urls.iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let checker = self.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (slot, checker.check_url(&url).await)
            });
        }

        let mut slots: Vec<Option<SiteCheckReport>> = urls.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, report)) => slots[slot] = Some(report),
                Err(e) => tracing::error!("Drift check task failed: {}", e),
            }
        }

        let entries = urls
            .into_iter()
            .zip(slots)
            .map(|(url, report)| {
                report.unwrap_or_else(|| {
                    SiteCheckReport::new(url, Verdict::FetchFailure(ObservationIndex::First))
                })
            })
            .collect();
        DriftReport { entries }
    }

    /// Run the full two-observation check for one URL
    pub async fn check_url(&self, url: &str) -> SiteCheckReport {
        let parsed = match parse_target(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", url, e);
                let mut report =
                    SiteCheckReport::new(url, Verdict::FetchFailure(ObservationIndex::First));
                report.observations.push(Observation::new(
                    ObservationIndex::First,
                    vec![FetchAttempt::failure(url, self.engine.backend(), 1, e.to_string())],
                ));
                return report;
            }
        };

        if let Some(robots) = &self.robots {
            if !robots.check(&parsed).await {
                tracing::info!("{}: Disallowed by robots.txt", url);
                return SiteCheckReport::new(url, Verdict::Disallowed);
            }
        }

        let mut report = SiteCheckReport::new(url, Verdict::FetchFailure(ObservationIndex::First));
        match self.observe_and_classify(&parsed, &mut report).await {
            Ok(verdict) => report.verdict = verdict,
            Err(e) => tracing::error!("Drift check for {} aborted: {}", url, e),
        }

        tracing::info!("{}: {}", url, report.verdict);
        report
    }

    async fn observe_and_classify(
        &self,
        url: &Url,
        report: &mut SiteCheckReport,
    ) -> Result<Verdict, ClassifyError> {
        let deadline = self.config.url_deadline.map(|budget| Instant::now() + budget);
        let mut canonical: Vec<CanonicalDocument> = Vec::with_capacity(2);

        let first = self.engine.fetch_until(url, ObservationIndex::First, deadline).await;
        let first_doc = self.canonicalize(&first).await;
        report.observations.push(first);
        canonical.extend(first_doc.clone());
        let mut state = CheckState::new().on_first(first_doc)?;

        if !state.is_done() {
            if !self.config.observation_interval.is_zero() {
                tokio::time::sleep(self.config.observation_interval).await;
            }
            let second = self
                .engine
                .fetch_until(url, ObservationIndex::Second, deadline)
                .await;
            let second_doc = self.canonicalize(&second).await;
            report.observations.push(second);
            canonical.extend(second_doc.clone());
            state = state.on_second(second_doc)?;
        }

        if let Some((first, second)) = state.documents() {
            let text_a = first.text.clone();
            let text_b = second.text.clone();
            // Similarity is quadratic in the worst case
            let comparison = match tokio::task::spawn_blocking(move || compare(&text_a, &text_b)).await {
                Ok(comparison) => comparison,
                Err(e) => {
                    tracing::error!("Comparison task for {} failed: {}", url, e);
                    compare(&first.text, &second.text)
                }
            };
            tracing::debug!(
                "{}: digests {} / {}, ratio {:?}",
                url,
                comparison.digest_a,
                comparison.digest_b,
                comparison.similarity_ratio
            );
            state = state.on_compared(&comparison, &self.classifier)?;
            report.comparison = Some(comparison);
        }

        let verdict = state
            .verdict()
            .unwrap_or(Verdict::FetchFailure(ObservationIndex::First));
        let artifacts = self.persist(url.as_str(), verdict, report, &canonical).await;
        report.artifacts = artifacts;
        Ok(verdict)
    }

    /// Canonicalize a successful observation on a blocking thread.
    /// If that task dies, the raw-stream fallback stands in for it.
    async fn canonicalize(&self, observation: &Observation) -> Option<CanonicalDocument> {
        if !observation.succeeded() {
            return None;
        }
        let canonicalizer = self.canonicalizer.clone();
        let owned = observation.clone();
        match tokio::task::spawn_blocking(move || canonicalizer.canonicalize_observation(&owned)).await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Canonicalization task failed: {}, using raw text fallback", e);
                Canonicalizer::fallback_observation(observation)
            }
        }
    }

    async fn persist(
        &self,
        url: &str,
        verdict: Verdict,
        report: &SiteCheckReport,
        canonical: &[CanonicalDocument],
    ) -> Vec<std::path::PathBuf> {
        let Some(store) = &self.artifacts else {
            return Vec::new();
        };

        let mut items: Vec<(ArtifactKind, &str)> = Vec::new();
        if store.keeps_raw(verdict) {
            for observation in &report.observations {
                if let Some(body) = observation.body() {
                    items.push((ArtifactKind::Raw(observation.index), body));
                }
            }
        }
        if store.keeps_canonical(verdict) {
            for document in canonical {
                items.push((ArtifactKind::Canonical(document.observation), document.text.as_str()));
            }
        }

        if items.is_empty() {
            return Vec::new();
        }
        store.write_all(url, &items).await
    }
}

/// Only absolute http(s) URLs can be checked
fn parse_target(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

/// Trimmed URLs with repeats removed, first occurrence kept. Blank entries
/// stay in so they are reported as invalid.
pub fn dedupe_urls(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(urls.len());
    for url in urls {
        let url = url.trim();
        if seen.insert(url.to_string()) {
            unique.push(url.to_string());
        } else {
            tracing::warn!("Duplicate URL {} ignored", url);
        }
    }
    unique
}
