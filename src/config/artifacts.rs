//! Artifact persistence configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// When raw fetch bodies are written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawArtifactPolicy {
    /// Every successful observation
    Always,
    /// Only for `Similar` and `Mismatch` verdicts
    OnDrift,
    Never,
}

/// Where and what to persist for later inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Output directory
    pub dir: PathBuf,
    /// Raw HTML persistence policy
    pub raw: RawArtifactPolicy,
    /// Write canonical text dumps for drift verdicts
    pub canonical: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("drift_artifacts"),
            raw: RawArtifactPolicy::Always,
            canonical: true,
        }
    }
}
