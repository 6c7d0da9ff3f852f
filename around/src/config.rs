//! Around configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::CoordinatorConfig;

/// Main Around configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reminder timing and content
    pub reminder: ReminderConfig,

    /// Home geofence settings
    pub geofence: GeofenceConfig,

    /// Coordinator queue sizing
    pub coordinator: CoordinatorConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.reminder.threshold == 0 {
            return Err(eyre::eyre!("reminder.threshold must be at least 1"));
        }
        if self.reminder.tick_interval_ms == 0 {
            return Err(eyre::eyre!("reminder.tick-interval-ms must be greater than 0"));
        }
        if self.coordinator.channel_buffer == 0 || self.coordinator.event_buffer == 0 {
            return Err(eyre::eyre!("coordinator buffers must be greater than 0"));
        }
        if !(self.geofence.radius_degrees.is_finite() && self.geofence.radius_degrees >= 0.0) {
            return Err(eyre::eyre!(
                "geofence.radius-degrees must be a non-negative number, got {}",
                self.geofence.radius_degrees
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .around.yml
        let local_config = PathBuf::from(".around.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/around/around.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("around").join("around.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// When and what to remind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Consecutive unlocked samples before the reminder fires
    pub threshold: u32,

    /// Screen sampling period in milliseconds
    #[serde(rename = "tick-interval-ms")]
    pub tick_interval_ms: u64,

    /// Notification title
    pub title: String,

    /// Notification body
    pub body: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            threshold: crate::DEFAULT_THRESHOLD,
            tick_interval_ms: 1000,
            title: "Look Around".to_string(),
            body: "Reminder to look around".to_string(),
        }
    }
}

impl ReminderConfig {
    /// Sampling period as a Duration (never zero)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Home geofence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Radius of the home circle in coordinate degrees
    #[serde(rename = "radius-degrees")]
    pub radius_degrees: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            radius_degrees: crate::DEFAULT_RADIUS_DEGREES,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding persisted preferences
    #[serde(rename = "preferences-path")]
    pub preferences_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            preferences_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("around")
                .join("preferences.json"),
        }
    }
}
