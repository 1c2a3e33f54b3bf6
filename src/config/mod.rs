//! Configuration for pagedrift

mod artifacts;
mod check;
mod logging;

pub use artifacts::{ArtifactConfig, RawArtifactPolicy};
pub use check::{CheckConfig, FetchSettings, RobotsConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for page fetches and robots.txt matching
pub const DEFAULT_USER_AGENT: &str = "pagedrift/0.1 (+https://github.com/pagedrift)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Drift check policy
    #[serde(default)]
    pub check: CheckConfig,
    /// HTTP client settings
    #[serde(default)]
    pub fetch: FetchSettings,
    /// Artifact persistence
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// robots.txt gate
    #[serde(default)]
    pub robots: RobotsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Render as TOML (used by `init`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
    }

    /// Validate all configuration fields.
    ///
    /// Collects every error and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Check policy
        if self.check.timeout_secs == 0 {
            errors.push("timeout_secs must be positive".to_string());
        }
        if self.check.max_retries == 0 {
            errors.push("max_retries must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.check.similarity_threshold) {
            errors.push("similarity_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.check.concurrency == 0 {
            errors.push("concurrency must be positive".to_string());
        }
        if self.check.concurrency > 64 {
            errors.push("concurrency must be <= 64".to_string());
        }
        if self.check.url_deadline_secs == Some(0) {
            errors.push("url_deadline_secs must be positive when set".to_string());
        }

        // Fetch settings
        if self.fetch.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        // Robots
        if self.robots.enabled && self.robots.cache_size == 0 {
            errors.push("robots cache_size must be positive".to_string());
        }

        // Artifacts
        if self.artifacts.dir.as_os_str().is_empty() {
            errors.push("artifacts dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    // ========================================================================
    // Defaults
    // ========================================================================

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = valid_config();
        assert_eq!(cfg.check.timeout_secs, 10);
        assert_eq!(cfg.check.max_retries, 3);
        assert_eq!(cfg.check.retry_backoff_ms, 2000);
        assert_eq!(cfg.check.settle_delay_secs, 2);
        assert!((cfg.check.similarity_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(cfg.artifacts.raw, RawArtifactPolicy::Always);
        assert!(cfg.robots.enabled);
    }

    // ========================================================================
    // TOML
    // ========================================================================

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[check]
max_retries = 5
headless = true

[artifacts]
raw = "on_drift"
"#,
        )
        .unwrap();
        assert_eq!(cfg.check.max_retries, 5);
        assert!(cfg.check.headless);
        assert_eq!(cfg.check.timeout_secs, 10);
        assert_eq!(cfg.artifacts.raw, RawArtifactPolicy::OnDrift);
        assert_eq!(cfg.fetch.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let text = valid_config().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.check.concurrency, 4);
        assert_eq!(parsed.robots.cache_size, 1024);
        assert!(parsed.check.url_deadline_secs.is_none());
    }

    #[test]
    fn load_reads_and_validates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pagedrift.toml");
        std::fs::write(&path, "[check]\nconcurrency = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("concurrency must be positive"));
    }

    #[test]
    fn load_or_default_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(cfg.check.max_retries, 3);
    }

    // ========================================================================
    // Config::validate
    // ========================================================================

    #[test]
    fn validate_rejects_zero_retries() {
        let mut cfg = valid_config();
        cfg.check.max_retries = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_retries must be at least 1"));
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut cfg = valid_config();
        cfg.check.similarity_threshold = 1.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn validate_accepts_threshold_bounds() {
        let mut cfg = valid_config();
        cfg.check.similarity_threshold = 0.0;
        assert!(cfg.validate().is_ok());
        cfg.check.similarity_threshold = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.check.timeout_secs = 0;
        cfg.fetch.user_agent = "  ".to_string();
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("timeout_secs must be positive"));
        assert!(msg.contains("user_agent must not be empty"));
    }

    #[test]
    fn validate_rejects_zero_deadline() {
        let mut cfg = valid_config();
        cfg.check.url_deadline_secs = Some(0);
        assert!(cfg.validate().is_err());
    }
}
