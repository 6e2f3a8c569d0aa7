//! Runtime configuration for the execution core.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orders::OcoConfig;
use crate::reconcile::{MissingOrderPolicy, ReconcileConfig};
use crate::stops::TrailingConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration, loadable from JSON. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Seconds between reconciliation passes
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Seconds between OCO watcher passes
    #[serde(default = "default_oco_interval")]
    pub oco_interval_secs: u64,

    /// Seconds between trailing stop ticks
    #[serde(default = "default_trailing_interval")]
    pub trailing_interval_secs: u64,

    /// What to do with a local open order the venue no longer lists
    #[serde(default)]
    pub missing_order_policy: MissingOrderPolicy,

    /// Minimum spacing of repeated per-venue failure warnings
    #[serde(default = "default_log_throttle")]
    pub log_throttle_secs: u64,

    /// Port for `/health` and `/metrics`; disabled when absent
    #[serde(default)]
    pub health_port: Option<u16>,

    /// Paper venues registered by the binary
    #[serde(default = "default_paper_venues")]
    pub paper_venues: Vec<String>,
}

fn default_reconcile_interval() -> u64 {
    30
}
fn default_oco_interval() -> u64 {
    3
}
fn default_trailing_interval() -> u64 {
    5
}
fn default_log_throttle() -> u64 {
    60
}
fn default_paper_venues() -> Vec<String> {
    vec!["PAPER".to_string()]
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            oco_interval_secs: default_oco_interval(),
            trailing_interval_secs: default_trailing_interval(),
            missing_order_policy: MissingOrderPolicy::default(),
            log_throttle_secs: default_log_throttle(),
            health_port: None,
            paper_venues: default_paper_venues(),
        }
    }
}

impl CoreConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("reconcile_interval_secs", self.reconcile_interval_secs),
            ("oco_interval_secs", self.oco_interval_secs),
            ("trailing_interval_secs", self.trailing_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        if self.paper_venues.iter().any(|v| v.trim().is_empty()) {
            return Err(ConfigError::Invalid("paper_venues cannot contain empty names".to_string()));
        }
        Ok(())
    }

    pub fn reconcile(&self) -> ReconcileConfig {
        ReconcileConfig {
            interval: Duration::from_secs(self.reconcile_interval_secs),
            missing_order_policy: self.missing_order_policy,
            failure_log_interval: Duration::from_secs(self.log_throttle_secs),
        }
    }

    pub fn oco(&self) -> OcoConfig {
        OcoConfig {
            interval: Duration::from_secs(self.oco_interval_secs),
        }
    }

    pub fn trailing(&self) -> TrailingConfig {
        TrailingConfig {
            interval: Duration::from_secs(self.trailing_interval_secs),
            failure_log_interval: Duration::from_secs(self.log_throttle_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = CoreConfig::from_json("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.reconcile().interval, Duration::from_secs(30));
        assert_eq!(config.oco().interval, Duration::from_secs(3));
        assert_eq!(config.trailing().interval, Duration::from_secs(5));
        assert_eq!(config.missing_order_policy, MissingOrderPolicy::AssumeFilled);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reconcile_interval_secs": 10, "missing_order_policy": "leave_open", "health_port": 9100, "paper_venues": ["SIM1", "SIM2"]}}"#
        )
        .unwrap();

        let config = CoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.reconcile_interval_secs, 10);
        assert_eq!(config.reconcile().missing_order_policy, MissingOrderPolicy::LeaveOpen);
        assert_eq!(config.health_port, Some(9100));
        assert_eq!(config.paper_venues, vec!["SIM1", "SIM2"]);
        assert_eq!(config.oco_interval_secs, 3);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CoreConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(CoreConfig::from_json("{not json"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            CoreConfig::from_json(r#"{"oco_interval_secs": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CoreConfig::from_json(r#"{"missing_order_policy": "guess"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
