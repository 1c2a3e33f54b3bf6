//! Coordinator types: configuration and run statistics

use std::time::Duration;

use crate::config::CheckConfig;
use crate::drift::classifier::DEFAULT_SIMILARITY_THRESHOLD;
use crate::types::{DriftReport, ObservationIndex, Verdict};

/// Configuration for the drift checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// URLs checked in parallel
    pub concurrency: usize,
    /// Inclusive lower bound of the ratio for `Similar`
    pub similarity_threshold: f64,
    /// Pause between the two observations of one URL
    pub observation_interval: Duration,
    /// Budget for both observations of one URL
    pub url_deadline: Option<Duration>,
}

impl CheckerConfig {
    pub fn from_config(config: &CheckConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            similarity_threshold: config.similarity_threshold,
            observation_interval: config.observation_interval(),
            url_deadline: config.url_deadline(),
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            observation_interval: Duration::ZERO,
            url_deadline: None,
        }
    }
}

/// Verdict counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub total: usize,
    pub matched: usize,
    pub similar: usize,
    pub mismatched: usize,
    pub failed_first: usize,
    pub failed_second: usize,
    pub disallowed: usize,
}

impl CheckStats {
    pub fn from_report(report: &DriftReport) -> Self {
        let mut stats = Self::default();
        for (_, verdict) in report.verdicts() {
            stats.total += 1;
            match verdict {
                Verdict::Match => stats.matched += 1,
                Verdict::Similar => stats.similar += 1,
                Verdict::Mismatch => stats.mismatched += 1,
                Verdict::FetchFailure(ObservationIndex::First) => stats.failed_first += 1,
                Verdict::FetchFailure(ObservationIndex::Second) => stats.failed_second += 1,
                Verdict::Disallowed => stats.disallowed += 1,
            }
        }
        stats
    }

    pub fn drifted(&self) -> usize {
        self.similar + self.mismatched
    }
}
