//! Configuration management module.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geo::Geofence;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub school: SchoolConfig,
    pub sync: SyncConfig,
}

/// School identity and geofence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the on-campus geofence (default: 100 m).
    #[serde(default = "default_geofence_radius")]
    pub geofence_radius_meters: f64,
    /// Check-ins after this local time count as late (HH:MM).
    #[serde(default = "default_late_after")]
    pub late_after: String,
}

fn default_geofence_radius() -> f64 {
    100.0
}

fn default_late_after() -> String {
    "09:00".to_string()
}

/// Sync operation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_enabled: bool,
    pub interval_minutes: u32,
    /// Latency of the simulated collaborators in the demo binary.
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
}

fn default_simulated_latency_ms() -> u64 {
    250
}

impl AppConfig {
    /// Get config file path (same directory as executable).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.school.name.trim().is_empty() {
            return Err(ConfigError::Validation("School name cannot be empty".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.school.latitude) {
            return Err(ConfigError::Validation(
                "School latitude must be between -90 and 90".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.school.longitude) {
            return Err(ConfigError::Validation(
                "School longitude must be between -180 and 180".to_string(),
            ));
        }
        if self.school.geofence_radius_meters <= 0.0 {
            return Err(ConfigError::Validation(
                "Geofence radius must be greater than 0".to_string(),
            ));
        }
        if self.school.late_after_time().is_none() {
            return Err(ConfigError::Validation(
                "Late-after time must be in HH:MM format".to_string(),
            ));
        }
        if self.sync.interval_minutes < 1 {
            return Err(ConfigError::Validation(
                "Sync interval must be at least 1 minute".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl SchoolConfig {
    /// Geofence built from the configured center and radius.
    pub fn geofence(&self) -> Geofence {
        Geofence::new(self.latitude, self.longitude, self.geofence_radius_meters)
    }

    /// Parsed late-after threshold, None if malformed.
    pub fn late_after_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.late_after, "%H:%M").ok()
    }
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            name: "Demo Public School".to_string(),
            latitude: 28.6139,
            longitude: 77.2090,
            geofence_radius_meters: default_geofence_radius(),
            late_after: default_late_after(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_enabled: false,
            interval_minutes: 60,
            simulated_latency_ms: default_simulated_latency_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_school_name() {
        let mut config = AppConfig::default();
        config.school.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_latitude_bounds() {
        let mut config = AppConfig::default();
        config.school.latitude = 91.0;
        assert!(config.validate().is_err());
        config.school.latitude = -91.0;
        assert!(config.validate().is_err());
        config.school.latitude = 28.6;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_radius_positive() {
        let mut config = AppConfig::default();
        config.school.geofence_radius_meters = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_late_after_format() {
        let mut config = AppConfig::default();
        config.school.late_after = "9 o'clock".to_string();
        assert!(config.validate().is_err());
        config.school.late_after = "08:30".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_sync_interval() {
        let mut config = AppConfig::default();
        config.sync.interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::default();
        config.save(&path).unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(loaded) => {
                assert_eq!(loaded.school.name, config.school.name);
                assert_eq!(loaded.sync.interval_minutes, config.sync.interval_minutes);
            }
            other => panic!("expected loaded config, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_config_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Missing));
    }

    #[test]
    fn test_invalid_toml_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Invalid(_)));
    }
}
