//! Controller configuration.

use crate::geo::{Bounds, LatLng};
use crate::style::MarkerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Region shown when neither an area nor a place is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub a: LatLng,
    pub b: LatLng,
}

impl Region {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(self.a, self.b)
    }
}

impl Default for Region {
    /// Berlin.
    fn default() -> Self {
        Self {
            a: LatLng::new(52.3570365, 13.2288599),
            b: LatLng::new(52.6770365, 13.5488599),
        }
    }
}

/// Settings of a [`Controller`](crate::controller::Controller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    /// UI language of the label catalog.
    pub language: String,
    pub fallback_language: String,
    /// Zoom used when centering on explicit coordinates.
    pub center_zoom: u8,
    pub default_region: Region,
    /// Websocket URL of the push relay.
    pub relay_url: String,
    /// Marker catalogue for point features. `None` draws plain markers.
    pub markers: Option<MarkerOptions>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            fallback_language: "en".to_string(),
            center_zoom: 12,
            default_region: Region::default(),
            relay_url: "ws://localhost:3030/ws".to_string(),
            markers: Some(MarkerOptions::default()),
        }
    }
}

impl ControllerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The default config file path.
    ///
    /// On Unix: `~/.config/gridmark/config.json`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_location() -> ConfigResult<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| ConfigError::Io("Could not determine config directory".to_string()))?;
        Ok(base.join("gridmark").join("config.json"))
    }
}
