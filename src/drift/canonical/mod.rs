//! Canonicalization of raw markup into comparable text
//!
//! Strips what varies between observations without being content:
//! - `script` and `style` elements
//! - elements whose class mentions "ad" (a heuristic ad stripper)
//! - `id` and `class` attributes
//!
//! and then reads text from the main content landmark, or the whole document
//! when the page has none. Output is deterministic for identical input.

mod fallback;
mod parser;

pub use fallback::extract_raw_text;
pub use parser::{DocumentParser, DomNode, MarkupError, ParsedDocument, ScraperParser, MAX_TREE_DEPTH};

use std::sync::Arc;

use crate::types::{CanonicalDocument, Observation};

/// Elements removed entirely before text extraction
const NON_CONTENT_TAGS: &[&str] = &["script", "style"];

/// Attributes that vary between observations without representing content
const VOLATILE_ATTRIBUTES: &[&str] = &["id", "class"];

/// Canonical text plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalText {
    pub text: String,
    /// True when the raw-stream fallback replaced tree-based extraction
    pub degraded: bool,
}

/// Whether an element's class attribute marks it as an ad
pub fn is_ad_element(node: &DomNode) -> bool {
    node.attr("class")
        .map(|class| class.to_ascii_lowercase().contains("ad"))
        .unwrap_or(false)
}

/// Turns raw markup into canonical text through a [`DocumentParser`]
#[derive(Clone)]
pub struct Canonicalizer {
    parser: Arc<dyn DocumentParser>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(Arc::new(ScraperParser::new()))
    }
}

impl Canonicalizer {
    pub fn new(parser: Arc<dyn DocumentParser>) -> Self {
        Self { parser }
    }

    /// Canonicalize raw markup. Never fails: markup the parser rejects is
    /// read straight from the raw stream instead.
    pub fn canonicalize(&self, raw: &str) -> CanonicalText {
        match self.parser.parse(raw) {
            Ok(mut doc) => CanonicalText {
                text: canonicalize_document(&mut doc),
                degraded: false,
            },
            Err(e) => {
                tracing::warn!("Markup could not be parsed ({}), using raw text fallback", e);
                CanonicalText {
                    text: extract_raw_text(raw),
                    degraded: true,
                }
            }
        }
    }

    /// Canonicalize the successful body of an observation
    pub fn canonicalize_observation(&self, observation: &Observation) -> Option<CanonicalDocument> {
        let attempt = observation.final_attempt().filter(|a| a.succeeded)?;
        let raw = attempt.body.as_deref()?;
        let canonical = self.canonicalize(raw);
        Some(CanonicalDocument {
            observation: observation.index,
            attempt: attempt.attempt,
            text: canonical.text,
            degraded: canonical.degraded,
        })
    }

    /// Raw-stream text of the successful body, marked degraded
    pub fn fallback_observation(observation: &Observation) -> Option<CanonicalDocument> {
        let attempt = observation.final_attempt().filter(|a| a.succeeded)?;
        let raw = attempt.body.as_deref()?;
        Some(CanonicalDocument {
            observation: observation.index,
            attempt: attempt.attempt,
            text: extract_raw_text(raw),
            degraded: true,
        })
    }
}

/// Apply the canonicalization steps, in order, to a parsed tree
pub fn canonicalize_document(doc: &mut ParsedDocument) -> String {
    for tag in NON_CONTENT_TAGS {
        doc.remove_by_tag(tag);
    }
    doc.remove_where(is_ad_element);
    for attr in VOLATILE_ATTRIBUTES {
        doc.strip_attribute(attr);
    }
    let landmark = doc.find_landmark();
    doc.extract_text(landmark)
}

/// Canonicalize with the default parser
pub fn canonicalize(raw: &str) -> String {
    Canonicalizer::default().canonicalize(raw).text
}
