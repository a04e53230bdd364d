/// Core data types for the Boktai solar sensor simulator.
///
/// This module defines the shared domain model imported by all other modules:
/// game versions, resolved locations, the record shape returned by weather
/// lookups, and the crate-wide error types. It contains no I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Game versions
// ---------------------------------------------------------------------------

/// Which Boktai game the gauge imitates.
///
/// Boktai 1 draws an 8-segment solar gauge; Boktai 2 and 3 draw 10 segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameVersion {
    One,
    Two,
    Three,
}

impl GameVersion {
    /// Number of segments in this version's gauge.
    pub fn capacity(self) -> u8 {
        match self {
            GameVersion::One => 8,
            GameVersion::Two | GameVersion::Three => 10,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            GameVersion::One => 1,
            GameVersion::Two => 2,
            GameVersion::Three => 3,
        }
    }
}

impl TryFrom<u8> for GameVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(GameVersion::One),
            2 => Ok(GameVersion::Two),
            3 => Ok(GameVersion::Three),
            other => Err(format!("Boktai version must be between 1 and 3, got {}", other)),
        }
    }
}

impl From<GameVersion> for u8 {
    fn from(version: GameVersion) -> Self {
        version.number()
    }
}

impl std::fmt::Display for GameVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Boktai {}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A location that has been resolved to coordinates and can be handed to a
/// weather source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Location key, `"<lat>,<lon>"`. Also used as the cache key.
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub state: String,
}

impl ResolvedLocation {
    pub fn from_coordinates(latitude: f64, longitude: f64, city: &str, state: &str) -> Self {
        Self {
            id: format!("{},{}", latitude, longitude),
            latitude,
            longitude,
            city: city.to_string(),
            state: state.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// External record shape
// ---------------------------------------------------------------------------

/// One weather lookup result, as produced by a `WeatherSource`.
///
/// Temperatures are Celsius. Timestamps are ISO 8601 with an explicit UTC
/// offset, e.g. `"2021-06-20T04:19:57-08:00"`. `condition_code` is one of the
/// short codes in `conditions::WEATHER_CLASSES` (`"c"`, `"lc"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub state: String,
    pub city: String,
    pub location_id: String,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub current_temp_c: f64,
    pub condition_code: String,
    pub sunrise: String,
    pub sunset: String,
    pub observed_at: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures reported by the external weather and geocoding collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupFailure {
    /// Non-2xx HTTP response from a lookup API.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),
    /// The response body, or a field inside it, could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The response was well-formed but held no usable data.
    #[error("No data available: {0}")]
    NoData(String),
}

/// Errors surfaced by the simulator core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoktaiError {
    /// A range-scaling precondition was violated (malformed bounds).
    #[error("Range error: {0}")]
    Range(String),
    /// An external weather or geocoding lookup failed. Never retried here.
    #[error("Lookup failed: {0}")]
    Lookup(#[from] LookupFailure),
    /// Unresolvable zip code or out-of-range coordinates.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    /// User-authored weather that does not make sense.
    #[error("Invalid manual input: {0}")]
    InvalidManualInput(String),
}

pub type Result<T> = std::result::Result<T, BoktaiError>;
