//! Configuration management for saltlimit.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{LimiterError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaltlimitConfig {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// In-memory cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Minimum spacing between admissions of one identifier, in milliseconds
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,

    /// Longest wait a caller accepts before being rejected, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold_ms: default_threshold_ms(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl LimiterConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

fn default_threshold_ms() -> u64 {
    1000
}

fn default_deadline_ms() -> u64 {
    5000
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How often expired entries are swept, in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

impl SaltlimitConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SaltlimitConfig = serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse config: {}", e)))?;

        if config.cache.sweep_interval_ms == 0 {
            return Err(LimiterError::Config(
                "cache.sweep_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SaltlimitConfig::default();
        assert_eq!(config.limiter.threshold(), Duration::from_secs(1));
        assert_eq!(config.limiter.deadline(), Duration::from_secs(5));
        assert_eq!(config.cache.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
limiter:
  threshold_ms: 100
  deadline_ms: 500
cache:
  sweep_interval_ms: 250
"#;
        let config = SaltlimitConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.threshold(), Duration::from_millis(100));
        assert_eq!(config.limiter.deadline(), Duration::from_millis(500));
        assert_eq!(config.cache.sweep_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let yaml = r#"
limiter:
  deadline_ms: 10
"#;
        let config = SaltlimitConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.threshold_ms, 1000);
        assert_eq!(config.limiter.deadline_ms, 10);
        assert_eq!(config.cache.sweep_interval_ms, 60_000);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = SaltlimitConfig::from_yaml("limiter: { threshold_ms: soon }");
        assert!(matches!(result, Err(LimiterError::Config(_))));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let yaml = r#"
cache:
  sweep_interval_ms: 0
"#;
        let result = SaltlimitConfig::from_yaml(yaml);
        assert!(matches!(result, Err(LimiterError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = SaltlimitConfig::from_file("/nonexistent/saltlimit.yaml");
        assert!(matches!(result, Err(LimiterError::Io(_))));
    }
}
