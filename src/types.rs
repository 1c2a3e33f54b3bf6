//! Core types for the drift detector

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Fetch Types
// ============================================================================

/// Which fetch backend produced a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Plain HTTP GET
    Http,
    /// Headless browser render
    HeadlessRender,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Http => f.write_str("http"),
            Backend::HeadlessRender => f.write_str("headless"),
        }
    }
}

/// Which of the two temporally separated observations of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationIndex {
    First,
    Second,
}

impl ObservationIndex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for ObservationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fetch attempt. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchAttempt {
    pub url: String,
    pub backend: Backend,
    /// Raw page content; present only on success
    #[serde(skip)]
    pub body: Option<String>,
    pub succeeded: bool,
    /// 1-based attempt number within its observation
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    /// Failure description for unsuccessful attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchAttempt {
    pub fn success(url: &str, backend: Backend, attempt: u32, body: String) -> Self {
        Self {
            url: url.to_string(),
            backend,
            body: Some(body),
            succeeded: true,
            attempt,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failure(url: &str, backend: Backend, attempt: u32, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            backend,
            body: None,
            succeeded: false,
            attempt,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// The attempt chain produced by one fetch call for one observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub index: ObservationIndex,
    pub attempts: Vec<FetchAttempt>,
}

impl Observation {
    pub fn new(index: ObservationIndex, attempts: Vec<FetchAttempt>) -> Self {
        Self { index, attempts }
    }

    /// The attempt that ended the chain (first success, or the last failure)
    pub fn final_attempt(&self) -> Option<&FetchAttempt> {
        self.attempts.last()
    }

    pub fn succeeded(&self) -> bool {
        self.final_attempt().map(|a| a.succeeded).unwrap_or(false)
    }

    /// Raw content of the successful attempt, if any
    pub fn body(&self) -> Option<&str> {
        self.final_attempt()
            .filter(|a| a.succeeded)
            .and_then(|a| a.body.as_deref())
    }
}

// ============================================================================
// Content Types
// ============================================================================

/// Normalized, comparable text derived from one observation's raw content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDocument {
    pub observation: ObservationIndex,
    /// Attempt number of the FetchAttempt the text came from
    pub attempt: u32,
    pub text: String,
    /// True when the raw-stream fallback was used instead of a parsed tree
    pub degraded: bool,
}

/// SHA-256 of canonical text (64-character lowercase hex string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub String);

impl ContentDigest {
    /// Compute the digest of canonical text
    pub fn compute(canonical_text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_text.as_bytes());
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of comparing two canonical documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub digest_a: ContentDigest,
    pub digest_b: ContentDigest,
    pub equal: bool,
    /// Present only when the digests differ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_ratio: Option<f64>,
}

// ============================================================================
// Verdicts and Reports
// ============================================================================

/// Final classification of a URL's consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Match,
    Similar,
    Mismatch,
    /// Fetching exhausted its retries on the given observation
    FetchFailure(ObservationIndex),
    /// robots.txt disallows our user agent; nothing was fetched
    Disallowed,
}

impl Verdict {
    /// Whether this verdict indicates content drift worth inspecting
    pub fn is_drift(&self) -> bool {
        matches!(self, Verdict::Similar | Verdict::Mismatch)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Match => f.write_str("Match"),
            Verdict::Similar => f.write_str("Similar"),
            Verdict::Mismatch => f.write_str("Mismatch"),
            Verdict::FetchFailure(which) => write!(f, "FetchFailure({})", which),
            Verdict::Disallowed => f.write_str("Disallowed"),
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-URL result of a drift check
#[derive(Debug, Clone, Serialize)]
pub struct SiteCheckReport {
    pub url: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
    /// First and second observation chains, in order (at most two)
    pub observations: Vec<Observation>,
    /// Files written for later inspection
    pub artifacts: Vec<PathBuf>,
}

impl SiteCheckReport {
    pub fn new(url: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            url: url.into(),
            verdict,
            comparison: None,
            observations: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

/// Report over all input URLs, one entry per distinct URL, in input order
#[derive(Debug, Clone, Default)]
pub struct DriftReport {
    pub entries: Vec<SiteCheckReport>,
}

impl DriftReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn verdict(&self, url: &str) -> Option<Verdict> {
        self.entries.iter().find(|e| e.url == url).map(|e| e.verdict)
    }

    /// (url, verdict) pairs in input order
    pub fn verdicts(&self) -> impl Iterator<Item = (&str, Verdict)> {
        self.entries.iter().map(|e| (e.url.as_str(), e.verdict))
    }

    /// Count of entries with the given verdict
    pub fn count(&self, verdict: Verdict) -> usize {
        self.entries.iter().filter(|e| e.verdict == verdict).count()
    }
}

/// Serializes as a JSON object `url -> verdict string`, preserving input order
impl Serialize for DriftReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.url, &entry.verdict)?;
        }
        map.end()
    }
}
