//! Configuration for the Analytics Collector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding a JSON bootstrap configuration.
pub const BOOTSTRAP_ENV: &str = "ANALYTICS_CONFIG";

/// Main configuration for the collector.
///
/// Built once at `init` from defaults plus caller overrides and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Base URL of the collection server
    pub server: String,

    /// Collect immediately on init and arm the interval timer
    pub auto: bool,

    /// Repeat period in milliseconds (<= 0 disables periodic collection)
    pub interval: i64,

    /// Emit collector log output
    pub debug: bool,

    /// Path appended to `server`
    pub endpoint: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:5000".to_string(),
            auto: true,
            interval: 0,
            debug: false,
            endpoint: "/collect".to_string(),
        }
    }
}

impl CollectorConfig {
    /// The repeat period, if periodic collection is enabled.
    pub fn period(&self) -> Option<Duration> {
        if self.interval > 0 {
            Some(Duration::from_millis(self.interval as u64))
        } else {
            None
        }
    }

    /// The fully-qualified collection URL.
    pub fn target_url(&self) -> String {
        crate::transport::target_url(&self.server, &self.endpoint)
    }
}

/// Caller-supplied configuration; unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub auto: Option<bool>,
    pub interval: Option<i64>,
    pub debug: Option<bool>,
    pub endpoint: Option<String>,
}

impl ConfigOverrides {
    /// Parse overrides from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Merge these overrides onto a base configuration, field by field.
    pub fn apply_to(&self, base: &CollectorConfig) -> CollectorConfig {
        CollectorConfig {
            server: self.server.clone().unwrap_or_else(|| base.server.clone()),
            auto: self.auto.unwrap_or(base.auto),
            interval: self.interval.unwrap_or(base.interval),
            debug: self.debug.unwrap_or(base.debug),
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| base.endpoint.clone()),
        }
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merged_with(self, other: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            server: other.server.or(self.server),
            auto: other.auto.or(self.auto),
            interval: other.interval.or(self.interval),
            debug: other.debug.or(self.debug),
            endpoint: other.endpoint.or(self.endpoint),
        }
    }
}

/// Where the startup configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapSource {
    Environment,
    File(PathBuf),
}

/// A startup configuration found in the process environment.
///
/// Its presence triggers auto-initialization, the same way a page-global
/// configuration object does for an embedded script.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub source: BootstrapSource,
    pub overrides: ConfigOverrides,
}

impl Bootstrap {
    /// Look for a bootstrap configuration.
    ///
    /// `ANALYTICS_CONFIG` takes precedence over the config file.
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        if let Ok(json) = std::env::var(BOOTSTRAP_ENV) {
            if !json.trim().is_empty() {
                return Ok(Some(Self {
                    source: BootstrapSource::Environment,
                    overrides: ConfigOverrides::from_json(&json)?,
                }));
            }
        }

        Self::from_file(&Self::config_path())
    }

    /// Load a bootstrap configuration from a file, if it exists.
    pub fn from_file(path: &std::path::Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(Some(Self {
            source: BootstrapSource::File(path.to_path_buf()),
            overrides: ConfigOverrides::from_json(&content)?,
        }))
    }

    /// Get the path to the bootstrap configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("analytics-collector")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.server, "http://localhost:5000");
        assert!(config.auto);
        assert_eq!(config.interval, 0);
        assert!(!config.debug);
        assert_eq!(config.endpoint, "/collect");
        assert_eq!(config.period(), None);
    }

    #[test]
    fn test_overrides_win_field_by_field() {
        let overrides = ConfigOverrides::from_json(r#"{"server":"https://x.test","interval":30000}"#)
            .unwrap();
        let config = overrides.apply_to(&CollectorConfig::default());

        assert_eq!(config.server, "https://x.test");
        assert_eq!(config.interval, 30000);
        assert_eq!(config.period(), Some(Duration::from_secs(30)));
        // untouched fields keep defaults
        assert!(config.auto);
        assert_eq!(config.endpoint, "/collect");
    }

    #[test]
    fn test_non_positive_interval_disables_period() {
        let config = ConfigOverrides {
            interval: Some(-5),
            ..Default::default()
        }
        .apply_to(&CollectorConfig::default());
        assert_eq!(config.period(), None);
    }

    #[test]
    fn test_merged_with_prefers_later_layer() {
        let base = ConfigOverrides {
            server: Some("http://a".into()),
            debug: Some(true),
            ..Default::default()
        };
        let top = ConfigOverrides {
            server: Some("http://b".into()),
            ..Default::default()
        };
        let merged = base.merged_with(top);
        assert_eq!(merged.server.as_deref(), Some("http://b"));
        assert_eq!(merged.debug, Some(true));
    }

    #[test]
    fn test_malformed_overrides_rejected() {
        assert!(matches!(
            ConfigOverrides::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_bootstrap_missing_file_is_none() {
        let path = std::env::temp_dir().join("analytics-collector-missing-bootstrap.json");
        assert!(Bootstrap::from_file(&path).unwrap().is_none());
    }

    #[test]
    fn test_bootstrap_from_file() {
        let path = std::env::temp_dir().join(format!(
            "analytics-collector-bootstrap-{}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, r#"{"auto":false,"endpoint":"/ingest"}"#).unwrap();

        let bootstrap = Bootstrap::from_file(&path).unwrap().unwrap();
        assert_eq!(bootstrap.source, BootstrapSource::File(path.clone()));
        assert_eq!(bootstrap.overrides.auto, Some(false));
        assert_eq!(bootstrap.overrides.endpoint.as_deref(), Some("/ingest"));

        let _ = std::fs::remove_file(path);
    }
}
