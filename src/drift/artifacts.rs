//! Artifact persistence for later inspection
//!
//! Files are named after the URL with its scheme removed:
//! `<slug>_first.html`, `<slug>_second.html`, `<slug>_canonical_first.txt`
//! and `<slug>_canonical_second.txt`. Write failures are reported to the
//! caller, which logs them; they never change a verdict.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ArtifactConfig, RawArtifactPolicy};
use crate::types::{ObservationIndex, Verdict};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What an artifact file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Raw(ObservationIndex),
    Canonical(ObservationIndex),
}

impl ArtifactKind {
    fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Raw(ObservationIndex::First) => "_first.html",
            ArtifactKind::Raw(ObservationIndex::Second) => "_second.html",
            ArtifactKind::Canonical(ObservationIndex::First) => "_canonical_first.txt",
            ArtifactKind::Canonical(ObservationIndex::Second) => "_canonical_second.txt",
        }
    }
}

/// Filesystem-safe name for a URL: scheme dropped, every character outside
/// `[A-Za-z0-9._-]` replaced by `_`
pub fn slug(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes raw and canonical artifacts into one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    raw: RawArtifactPolicy,
    canonical: bool,
}

impl ArtifactStore {
    pub fn new(config: &ArtifactConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            raw: config.raw,
            canonical: config.canonical,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!("{}{}", slug(url), kind.suffix()))
    }

    /// Whether raw bodies are kept for a URL ending in `verdict`
    pub fn keeps_raw(&self, verdict: Verdict) -> bool {
        match self.raw {
            RawArtifactPolicy::Always => true,
            RawArtifactPolicy::OnDrift => verdict.is_drift(),
            RawArtifactPolicy::Never => false,
        }
    }

    /// Whether canonical dumps are kept for a URL ending in `verdict`
    pub fn keeps_canonical(&self, verdict: Verdict) -> bool {
        self.canonical && verdict.is_drift()
    }

    /// Write one artifact, creating the directory if needed
    pub async fn write(&self, url: &str, kind: ArtifactKind, content: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(url, kind);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ArtifactError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::debug!("Saved {}", path.display());
        Ok(path)
    }

    /// Write every artifact in `items`, logging failures.
    /// Returns the paths that were written.
    pub async fn write_all(&self, url: &str, items: &[(ArtifactKind, &str)]) -> Vec<PathBuf> {
        let mut written = Vec::with_capacity(items.len());
        for (kind, content) in items {
            match self.write(url, *kind, content).await {
                Ok(path) => written.push(path),
                Err(e) => tracing::warn!("{}", e),
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, raw: RawArtifactPolicy) -> ArtifactStore {
        ArtifactStore::new(&ArtifactConfig {
            dir: dir.to_path_buf(),
            raw,
            canonical: true,
        })
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("https://example.com/a/b"), "example.com_a_b");
        assert_eq!(slug("http://h.test/p?q=1&r=2"), "h.test_p_q_1_r_2");
        assert_eq!(slug("example.com/x-y_z"), "example.com_x-y_z");
        assert_eq!(slug("https://ex.com:8080/é"), "ex.com_8080__");
    }

    #[test]
    fn test_artifact_names() {
        let s = store(Path::new("out"), RawArtifactPolicy::Always);
        let url = "https://example.com/page";
        assert_eq!(
            s.path_for(url, ArtifactKind::Raw(ObservationIndex::First)),
            Path::new("out/example.com_page_first.html")
        );
        assert_eq!(
            s.path_for(url, ArtifactKind::Canonical(ObservationIndex::Second)),
            Path::new("out/example.com_page_canonical_second.txt")
        );
    }

    #[test]
    fn test_policies() {
        let dir = Path::new("out");
        let always = store(dir, RawArtifactPolicy::Always);
        assert!(always.keeps_raw(Verdict::Match));
        assert!(!always.keeps_canonical(Verdict::Match));
        assert!(always.keeps_canonical(Verdict::Mismatch));

        let on_drift = store(dir, RawArtifactPolicy::OnDrift);
        assert!(!on_drift.keeps_raw(Verdict::Match));
        assert!(on_drift.keeps_raw(Verdict::Similar));

        let never = store(dir, RawArtifactPolicy::Never);
        assert!(!never.keeps_raw(Verdict::Mismatch));
    }

    #[tokio::test]
    async fn test_write_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let s = store(&tmp.path().join("nested"), RawArtifactPolicy::Always);
        let path = s
            .write("https://a.test/", ArtifactKind::Raw(ObservationIndex::First), "<p>x</p>")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>x</p>");
        assert!(path.ends_with("a.test__first.html"));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        // A file where the directory should be
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let s = store(&blocker, RawArtifactPolicy::Always);

        let err = s
            .write("https://a.test/", ArtifactKind::Raw(ObservationIndex::First), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));

        let written = s
            .write_all("https://a.test/", &[(ArtifactKind::Raw(ObservationIndex::Second), "y")])
            .await;
        assert!(written.is_empty());
    }
}
