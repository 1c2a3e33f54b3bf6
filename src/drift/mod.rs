//! Page drift detection
//!
//! Fetch a page twice, reduce each response to canonical text, and compare:
//! identical digests are a `Match`, a high similarity ratio is `Similar`,
//! anything else is a `Mismatch`.

pub mod artifacts;
pub mod canonical;
pub mod classifier;
pub mod coordinator;
pub mod digest;
pub mod fetcher;
pub mod render;
pub mod robots;
pub mod throttle;
pub mod whitelist;

pub use artifacts::{slug, ArtifactError, ArtifactKind, ArtifactStore};
pub use canonical::{canonicalize, CanonicalText, Canonicalizer, DocumentParser, ScraperParser};
pub use classifier::{CheckState, ClassifyError, Classifier};
pub use coordinator::{CheckStats, CheckerConfig, DriftChecker};
pub use digest::{compare, digest, similarity};
pub use fetcher::{FetchEngine, FetchError, FetchPolicy, HttpSource, PageSource};
pub use render::{HeadlessSource, RenderConfig};
pub use robots::{RobotsError, RobotsGate, RobotsRules};
pub use throttle::HostThrottle;
pub use whitelist::{Whitelist, WhitelistEntry};
