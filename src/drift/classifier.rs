//! Per-URL classification state machine
//!
//! `AwaitingFirst -> AwaitingSecond -> Comparing -> Done`. A failed
//! observation short-circuits straight to `Done(FetchFailure(..))`, so no
//! comparison ever happens after a fetch failure.

use thiserror::Error;

use crate::types::{CanonicalDocument, ComparisonResult, ObservationIndex, Verdict};

/// Default inclusive lower bound of the similarity ratio for `Similar`
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Unexpected event '{event}' in state '{state}'")]
    UnexpectedEvent {
        state: &'static str,
        event: &'static str,
    },
}

/// Maps a comparison to a verdict
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl Classifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Equal digests are a `Match`; otherwise the ratio decides between
    /// `Similar` (at or above the threshold) and `Mismatch`.
    pub fn classify(&self, comparison: &ComparisonResult) -> Verdict {
        if comparison.equal {
            return Verdict::Match;
        }
        match comparison.similarity_ratio {
            Some(ratio) if ratio >= self.threshold => Verdict::Similar,
            _ => Verdict::Mismatch,
        }
    }
}

/// Where one URL's check currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum CheckState {
    AwaitingFirst,
    AwaitingSecond {
        first: CanonicalDocument,
    },
    Comparing {
        first: CanonicalDocument,
        second: CanonicalDocument,
    },
    Done(Verdict),
}

impl Default for CheckState {
    fn default() -> Self {
        Self::AwaitingFirst
    }
}

impl CheckState {
    pub fn new() -> Self {
        Self::AwaitingFirst
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckState::AwaitingFirst => "awaiting_first",
            CheckState::AwaitingSecond { .. } => "awaiting_second",
            CheckState::Comparing { .. } => "comparing",
            CheckState::Done(_) => "done",
        }
    }

    /// Feed the first observation's canonical document, `None` if it failed
    pub fn on_first(self, document: Option<CanonicalDocument>) -> Result<Self, ClassifyError> {
        match self {
            CheckState::AwaitingFirst => Ok(match document {
                Some(first) => CheckState::AwaitingSecond { first },
                None => CheckState::Done(Verdict::FetchFailure(ObservationIndex::First)),
            }),
            other => Err(other.unexpected("first_observation")),
        }
    }

    /// Feed the second observation's canonical document, `None` if it failed
    pub fn on_second(self, document: Option<CanonicalDocument>) -> Result<Self, ClassifyError> {
        match self {
            CheckState::AwaitingSecond { first } => Ok(match document {
                Some(second) => CheckState::Comparing { first, second },
                None => CheckState::Done(Verdict::FetchFailure(ObservationIndex::Second)),
            }),
            other => Err(other.unexpected("second_observation")),
        }
    }

    /// Feed the comparison of the two documents
    pub fn on_compared(
        self,
        comparison: &ComparisonResult,
        classifier: &Classifier,
    ) -> Result<Self, ClassifyError> {
        match self {
            CheckState::Comparing { .. } => Ok(CheckState::Done(classifier.classify(comparison))),
            other => Err(other.unexpected("compared")),
        }
    }

    /// The two documents awaiting comparison
    pub fn documents(&self) -> Option<(&CanonicalDocument, &CanonicalDocument)> {
        match self {
            CheckState::Comparing { first, second } => Some((first, second)),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            CheckState::Done(verdict) => Some(*verdict),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, CheckState::Done(_))
    }

    fn unexpected(&self, event: &'static str) -> ClassifyError {
        ClassifyError::UnexpectedEvent {
            state: self.name(),
            event,
        }
    }
}
