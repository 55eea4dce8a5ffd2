//! Configuration management for Telemirror
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable that overrides `account.password`
pub const PASSWORD_ENV: &str = "TELEMIRROR_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin instance name, also the fallback car identifier
    pub name: String,

    /// Connected services account
    pub account: AccountConfig,

    /// Home location formatted as `<lat>;<lon>`
    pub home_location: Option<String>,

    /// Heartbeat throttling
    pub heartbeat: HeartbeatConfig,

    /// Minimum hours between forced republishing of an unchanged value
    pub refresh_interval_hours: u32,

    /// Vehicle cloud endpoints
    pub provider: ProviderConfig,

    /// Reverse geocoding for the parking address
    pub geocoding: GeocodingConfig,

    /// Local device store
    pub registry: RegistryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Dump redacted configuration and known devices at start
    pub debug: bool,
}

/// Account credentials and vehicle selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,

    /// Locale sent to the provider, for example `en-gb`
    pub locale: String,

    /// Part of the alias, license plate, VIN or model of the car
    pub car: Option<String>,

    pub region: String,
}

/// Heartbeat throttling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Number of heartbeats between two polls
    pub interval_ticks: u32,

    /// Seconds between heartbeats
    pub period_secs: u64,
}

/// Vehicle cloud endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub auth_url: String,
    pub vehicles_url: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

/// Reverse geocoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub enabled: bool,
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Device store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file holding registered devices and their last values
    pub state_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file
    pub file: String,

    /// Number of backup files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Home coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl HomeCoordinates {
    /// Parse a `<lat>;<lon>` pair
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split(';').map(str::trim);
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(MirrorError::validation(
                "home_location",
                "Expected '<lat>;<lon>'",
            ));
        };
        let latitude = lat
            .parse::<f64>()
            .map_err(|e| MirrorError::validation("home_location", e.to_string().as_str()))?;
        let longitude = lon
            .parse::<f64>()
            .map_err(|e| MirrorError::validation("home_location", e.to_string().as_str()))?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(MirrorError::validation(
                "home_location",
                "Coordinates out of range",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "telemirror.yaml",
            "/data/telemirror.yaml",
            "/etc/telemirror/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(PASSWORD_ENV)
            && !password.is_empty()
        {
            self.account.password = password;
        }
    }

    /// Parsed home coordinates, `None` when unset or malformed
    pub fn home_coordinates(&self) -> Option<HomeCoordinates> {
        let raw = self.home_location.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        HomeCoordinates::parse(raw).ok()
    }

    /// Refresh interval as a duration
    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.refresh_interval_hours))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account.username.trim().is_empty() {
            return Err(MirrorError::validation(
                "account.username",
                "Username cannot be empty",
            ));
        }

        if self.account.password.is_empty() {
            return Err(MirrorError::validation(
                "account.password",
                "Password cannot be empty",
            ));
        }

        if self.heartbeat.interval_ticks == 0 {
            return Err(MirrorError::validation(
                "heartbeat.interval_ticks",
                "Must be greater than 0",
            ));
        }

        if self.heartbeat.period_secs == 0 {
            return Err(MirrorError::validation(
                "heartbeat.period_secs",
                "Must be greater than 0",
            ));
        }

        if self.refresh_interval_hours == 0 {
            return Err(MirrorError::validation(
                "refresh_interval_hours",
                "Must be greater than 0",
            ));
        }

        if self.provider.timeout_secs == 0 || self.geocoding.timeout_secs == 0 {
            return Err(MirrorError::validation(
                "timeout_secs",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Configuration lines safe to write to the log
    pub fn redacted_summary(&self) -> Vec<String> {
        const MASK: &str = "******";
        let mut lines = vec![
            format!("'name': '{}'", self.name),
            format!("'username': '{}'", MASK),
            format!("'password': '{}'", MASK),
            format!("'locale': '{}'", self.account.locale),
            format!("'region': '{}'", self.account.region),
        ];
        if let Some(car) = &self.account.car {
            lines.push(format!("'car': '{}'", car));
        }
        if let Some(home) = &self.home_location {
            lines.push(format!("'home_location': '{}'", home));
        }
        lines.push(format!(
            "'heartbeat': every {} ticks of {}s",
            self.heartbeat.interval_ticks, self.heartbeat.period_secs
        ));
        lines.push(format!(
            "'refresh_interval_hours': {}",
            self.refresh_interval_hours
        ));
        lines
    }
}
