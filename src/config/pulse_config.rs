//! Board Configuration - presentation tuning values as operator-tunable TOML
//!
//! Each struct implements `Default` with the values in [`super::defaults`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "PULSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pulse_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `PulseConfig::load()` which searches:
/// 1. `$PULSE_CONFIG` env var
/// 2. `./pulse_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub classification: ClassificationConfig,

    #[serde(default)]
    pub tension: TensionConfig,

    #[serde(default)]
    pub activity: ActivityConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

impl PulseConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded board config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded board config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Board config saved");
        Ok(())
    }

    /// Validate all tunables for internal consistency.
    ///
    /// Rules:
    /// - Confidence threshold within 0-100
    /// - Medium risk amount <= high risk amount, both finite and >= 0
    /// - Window and channel capacities > 0
    /// - Recent events limit <= window capacity
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let c = &self.classification;
        if !c.low_confidence_threshold.is_finite()
            || !(0.0..=100.0).contains(&c.low_confidence_threshold)
        {
            errors.push(format!(
                "classification.low_confidence_threshold ({}) must be within 0-100",
                c.low_confidence_threshold
            ));
        }
        Self::check_escalation(
            c.medium_risk_amount,
            c.high_risk_amount,
            "classification.risk_amount",
            &mut errors,
        );

        let a = &self.activity;
        if a.event_window_capacity == 0 {
            errors.push("activity.event_window_capacity must be > 0".to_string());
        }
        if a.recent_events_limit > a.event_window_capacity {
            errors.push(format!(
                "activity.recent_events_limit ({}) must be <= event_window_capacity ({})",
                a.recent_events_limit, a.event_window_capacity
            ));
        }

        if self.health.change_channel_capacity == 0 {
            errors.push("health.change_channel_capacity must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(medium: f64, high: f64, name: &str, errors: &mut Vec<String>) {
        if !medium.is_finite() || !high.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got medium={medium}, high={high})"
            ));
            return;
        }
        if medium < 0.0 {
            errors.push(format!("{name}: medium ({medium:.2}) cannot be negative"));
        }
        if high < medium {
            errors.push(format!(
                "{name}: high ({high:.2}) must be >= medium ({medium:.2})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Thresholds used by the classification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Confidence strictly below this forces an exception
    #[serde(default = "default_low_confidence")]
    pub low_confidence_threshold: f64,

    /// Amount strictly above this is high risk
    #[serde(default = "default_high_risk_amount")]
    pub high_risk_amount: f64,

    /// Amount strictly above this is medium risk
    #[serde(default = "default_medium_risk_amount")]
    pub medium_risk_amount: f64,
}

fn default_low_confidence() -> f64 { defaults::LOW_CONFIDENCE_THRESHOLD }
fn default_high_risk_amount() -> f64 { defaults::HIGH_RISK_AMOUNT }
fn default_medium_risk_amount() -> f64 { defaults::MEDIUM_RISK_AMOUNT }

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: default_low_confidence(),
            high_risk_amount: default_high_risk_amount(),
            medium_risk_amount: default_medium_risk_amount(),
        }
    }
}

/// Thresholds for the elevated tension level. Critical is any critical signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionConfig {
    #[serde(default = "default_elevated_urgent")]
    pub elevated_urgent_threshold: usize,

    #[serde(default = "default_elevated_pending")]
    pub elevated_pending_threshold: usize,
}

fn default_elevated_urgent() -> usize { defaults::ELEVATED_URGENT_THRESHOLD }
fn default_elevated_pending() -> usize { defaults::ELEVATED_PENDING_THRESHOLD }

impl Default for TensionConfig {
    fn default() -> Self {
        Self {
            elevated_urgent_threshold: default_elevated_urgent(),
            elevated_pending_threshold: default_elevated_pending(),
        }
    }
}

/// Rolling window and activity summary tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default = "default_seconds_saved")]
    pub seconds_saved_per_auto_item: u64,

    #[serde(default = "default_window_capacity")]
    pub event_window_capacity: usize,

    #[serde(default = "default_recent_limit")]
    pub recent_events_limit: usize,
}

fn default_seconds_saved() -> u64 { defaults::SECONDS_SAVED_PER_AUTO_ITEM }
fn default_window_capacity() -> usize { defaults::EVENT_WINDOW_CAPACITY }
fn default_recent_limit() -> usize { defaults::RECENT_EVENTS_LIMIT }

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            seconds_saved_per_auto_item: default_seconds_saved(),
            event_window_capacity: default_window_capacity(),
            recent_events_limit: default_recent_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_change_capacity")]
    pub change_channel_capacity: usize,
}

fn default_change_capacity() -> usize { defaults::HEALTH_CHANGE_CHANNEL_CAPACITY }

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            change_channel_capacity: default_change_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PulseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = PulseConfig::from_toml_str(
            r#"
[tension]
elevated_urgent_threshold = 4
"#,
        )
        .unwrap();
        assert_eq!(config.tension.elevated_urgent_threshold, 4);
        assert_eq!(config.tension.elevated_pending_threshold, 10);
        assert_eq!(config.activity.event_window_capacity, 20);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = PulseConfig::default();
        config.classification.medium_risk_amount = 500.0;
        config.activity.event_window_capacity = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pulse_config.toml");
        let mut config = PulseConfig::default();
        config.activity.seconds_saved_per_auto_item = 300;
        config.save_to_file(&path).unwrap();

        let loaded = PulseConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
