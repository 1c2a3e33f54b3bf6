//! pagedrift: web page drift detection
//!
//! Decides whether a page's content is stable across repeated observations
//! before it is trusted as a recurring extraction source:
//! - Plain HTTP or headless browser fetching with retries
//! - Deterministic canonicalization of markup into comparable text
//! - SHA-256 digests and a matching-blocks similarity ratio
//! - Bounded-parallel checks with per-host spacing and robots.txt gating
//! - Allow-list output for the pages that proved stable

pub mod config;
pub mod drift;
pub mod types;
pub mod util;

pub use config::Config;
pub use types::*;
