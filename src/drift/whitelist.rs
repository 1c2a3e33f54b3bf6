//! Allow-list of URLs whose content proved stable

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{DriftReport, Verdict};

/// Status recorded for every allow-listed URL
pub const STABLE_STATUS: &str = "Accessible";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// URL without its scheme
    pub name: String,
    pub url: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    pub whitelist: Vec<WhitelistEntry>,
}

impl Whitelist {
    /// Every `Match` URL of the report, in report order
    pub fn from_report(report: &DriftReport) -> Self {
        let whitelist = report
            .verdicts()
            .filter(|(_, verdict)| *verdict == Verdict::Match)
            .map(|(url, _)| WhitelistEntry {
                name: url
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(url)
                    .to_string(),
                url: url.to_string(),
                status: STABLE_STATUS.to_string(),
            })
            .collect();
        Self { whitelist }
    }

    pub fn len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write whitelist '{}': {}", path.display(), e))?;
        Ok(())
    }
}
