//! Runtime configuration.
//!
//! Loaded from YAML; every field has a default, so an empty file (or no file
//! at all) is a valid configuration. Durations use humantime syntax
//! (`"5s"`, `"250ms"`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use specgrade_core::ScoringMode;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do when an upstream validator fails or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorPolicy {
    /// Fail the whole grading run
    Abort,

    /// Log, record a `warn` finding and keep grading
    #[default]
    Degrade,
}

/// Where graded runs are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Results are returned but not stored
    #[default]
    None,

    /// Process-local tables, lost on exit
    Memory,

    /// One JSON file per run under `path`
    JsonDir { path: PathBuf },
}

/// Configuration for the grading pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Catalog file; the built-in catalog when unset
    pub catalog_path: Option<PathBuf>,

    pub default_mode: ScoringMode,

    /// Per-validator deadline
    #[serde(with = "humantime_serde")]
    pub validator_timeout: Duration,

    pub collaborator_policy: CollaboratorPolicy,

    pub store: StoreConfig,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,

    /// Maximum number of file-loaded catalogs kept in memory
    pub catalog_cache_capacity: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            default_mode: ScoringMode::CoverageBased,
            validator_timeout: Duration::from_secs(5),
            collaborator_policy: CollaboratorPolicy::Degrade,
            store: StoreConfig::None,
            log_level: "info".to_string(),
            catalog_cache_capacity: 16,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validator_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "validator_timeout must be greater than zero".to_string(),
            ));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        if self.catalog_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "catalog_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(RuntimeConfig::from_yaml("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = RuntimeConfig::from_yaml(
            r#"
catalog_path: catalogs/strict.yaml
default_mode: legacy
validator_timeout: 250ms
collaborator_policy: abort
store:
  kind: json_dir
  path: /var/lib/specgrade
log_level: debug
"#,
        )
        .unwrap();

        assert_eq!(config.catalog_path, Some(PathBuf::from("catalogs/strict.yaml")));
        assert_eq!(config.default_mode, ScoringMode::Legacy);
        assert_eq!(config.validator_timeout, Duration::from_millis(250));
        assert_eq!(config.collaborator_policy, CollaboratorPolicy::Abort);
        assert_eq!(
            config.store,
            StoreConfig::JsonDir {
                path: PathBuf::from("/var/lib/specgrade")
            }
        );
        assert_eq!(config.catalog_cache_capacity, 16);
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("validator_timeout: soon"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("validator_timeout: 0s"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_duration_round_trips_through_yaml() {
        let config = RuntimeConfig {
            validator_timeout: Duration::from_secs(90),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("1m 30s"));
        assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap(), config);
    }
}
