//! TOML-based application configuration.
//!
//! Stores:
//! - Collector endpoint and the point name sent with each fix
//! - Provider request parameters (interval, minimum displacement)
//! - Whether tracking needs explicit user confirmation before starting
//!
//! Configuration is stored at `~/.config/geotrack/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Remote collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Full URL the fix payload is POSTed to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// The `name` field of the point-geometry payload.
    #[serde(default = "default_point_name")]
    pub name: String,
}

/// Location provider request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_min_displacement_m")]
    pub min_displacement_m: f32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/geotrack/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Platforms that demand explicit consent before continuous tracking
    /// resolve this once at startup; the state machine never re-checks
    /// platform versions at runtime.
    #[serde(default)]
    pub require_confirmation: bool,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/api/geo/add/".into()
}
fn default_point_name() -> String {
    "geotrack".into()
}
fn default_interval_ms() -> u64 {
    10_000
}
fn default_min_displacement_m() -> f32 {
    10.0
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            name: default_point_name(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min_displacement_m: default_min_displacement_m(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            provider: ProviderConfig::default(),
            require_confirmation: false,
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = super::data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, writing defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Read a single value by dotted key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "collector.endpoint" => Some(self.collector.endpoint.clone()),
            "collector.name" => Some(self.collector.name.clone()),
            "provider.interval_ms" => Some(self.provider.interval_ms.to_string()),
            "provider.min_displacement_m" => Some(self.provider.min_displacement_m.to_string()),
            "require_confirmation" => Some(self.require_confirmation.to_string()),
            _ => None,
        }
    }

    /// Set a single value by dotted key and persist the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "collector.endpoint" => self.collector.endpoint = value.to_string(),
            "collector.name" => self.collector.name = value.to_string(),
            "provider.interval_ms" => {
                self.provider.interval_ms = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "provider.min_displacement_m" => {
                self.provider.min_displacement_m =
                    value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "require_confirmation" => {
                self.require_confirmation = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.save()
    }
}
