//! Conversion configuration.
//!
//! Loaded from TOML: an explicit `--config` path, else `config.toml` in the
//! platform config directory when present, else defaults.

use crate::align::InterpolationMethod;
use crate::session::{ActivityType, Metric};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for a conversion run. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Activity type used when the export does not name one
    pub sport: ActivityType,
    /// Drop trailing samples where speed and power are both zero
    pub trim_trailing_idle: bool,
    /// Method used to resample heart rate
    pub heart_rate_interpolation: InterpolationMethod,
    /// Series used as the time base; chosen automatically when unset
    pub primary: Option<Metric>,
    /// Lowest accepted device/integrated distance ratio
    pub distance_correction_min: f64,
    /// Highest accepted device/integrated distance ratio
    pub distance_correction_max: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sport: ActivityType::Biking,
            trim_trailing_idle: true,
            heart_rate_interpolation: InterpolationMethod::MonotoneCubic,
            primary: None,
            distance_correction_min: 0.94,
            distance_correction_max: 1.06,
        }
    }
}

impl ConversionConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.distance_correction_min, self.distance_correction_max);
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(ConfigError::Invalid(format!(
                "distance correction range {}..={} must be positive and ordered",
                min, max
            )));
        }
        Ok(())
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "wellness2tcx", "wellness2tcx")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ConversionConfig, ConfigError> {
    let config: ConversionConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration. An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<ConversionConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match get_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(ConversionConfig::default()),
        },
    };

    tracing::debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(&path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), ConversionConfig::default());
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config(
            r#"
            sport = "Running"
            trim_trailing_idle = false
            heart_rate_interpolation = "linear"
            primary = "power"
            distance_correction_min = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.sport, ActivityType::Running);
        assert!(!config.trim_trailing_idle);
        assert_eq!(config.heart_rate_interpolation, InterpolationMethod::Linear);
        assert_eq!(config.primary, Some(Metric::Power));
        assert_eq!(config.distance_correction_min, 0.9);
        assert_eq!(config.distance_correction_max, 1.06);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let err = parse_config("distance_correction_min = 1.2\ndistance_correction_max = 1.1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = parse_config("heart_rate_interpolation = \"spline\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sport = \"Other\"\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().sport, ActivityType::Other);
    }
}
