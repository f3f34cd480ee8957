mod config;
pub mod state;

pub use config::{CollectorConfig, Config, ProviderConfig};
pub use state::{PersistedRecord, StateStore};

use std::path::PathBuf;

/// Returns `~/.config/geotrack[-dev]/` based on GEOTRACK_ENV.
///
/// Set GEOTRACK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GEOTRACK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("geotrack-dev")
    } else {
        base_dir.join("geotrack")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
