/// User preferences.
///
/// Stored as TOML. Every field has a default, so a missing file or a file
/// written by an older build loads cleanly. The file location comes from
/// the `BOKTAISIM_CONFIG` environment variable (a `.env` file is honored by
/// the binary), falling back to `boktaisim.toml` in the working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::logging::LogLevel;
use crate::model::GameVersion;
use crate::units::TempScale;

pub const CONFIG_ENV_VAR: &str = "BOKTAISIM_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "boktaisim.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid preferences file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid logging level: {0}")]
    LoggingLevel(String),
}

/// How the last location was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    #[default]
    Zipcode,
    Latlon,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Seconds between gauge re-reads in watch mode.
    pub gui_update_interval: u64,
    /// Seconds before cached weather is refreshed.
    pub api_update_interval: u64,
    pub version: GameVersion,
    pub lunar_mode: bool,
    pub mute_alert_sounds: bool,
    pub mute_flavor_sounds: bool,
    pub alert_sound_option: String,
    pub area_type: AreaType,
    pub zipcode: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    // Manual weather, as last entered (Fahrenheit)
    pub min_f: Option<f64>,
    pub avg_f: Option<f64>,
    pub max_f: Option<f64>,
    pub weather: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub theme: String,
    pub temp_scale: TempScale,
    pub logging_level: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            gui_update_interval: 300,
            api_update_interval: 900,
            version: GameVersion::One,
            lunar_mode: false,
            mute_alert_sounds: false,
            mute_flavor_sounds: false,
            alert_sound_option: "chime1".to_string(),
            area_type: AreaType::Zipcode,
            zipcode: None,
            lat: None,
            lon: None,
            min_f: None,
            avg_f: None,
            max_f: None,
            weather: None,
            sunrise: None,
            sunset: None,
            theme: "default".to_string(),
            temp_scale: TempScale::Fahrenheit,
            logging_level: "INFO".to_string(),
        }
    }
}

impl Preferences {
    /// Loads preferences from `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::read(path)?.unwrap_or_else(|| {
            info!(path = %path.display(), "no preferences file, using defaults");
            Self::default()
        }))
    }

    /// Reads preferences from `path`. `None` when the file does not exist.
    ///
    /// Logs nothing on a missing file, so it can run before the logger is
    /// installed.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let prefs: Preferences = toml::from_str(&raw)?;
        debug!(path = %path.display(), "loaded preferences");
        Ok(Some(prefs))
    }

    /// Writes preferences to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let body = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, body).map_err(write_err)?;
        debug!(path = %path.display(), "saved preferences");
        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel, ConfigError> {
        self.logging_level
            .parse()
            .map_err(|_| ConfigError::LoggingLevel(self.logging_level.clone()))
    }
}

/// `$BOKTAISIM_CONFIG`, or `boktaisim.toml` in the working directory.
pub fn default_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
