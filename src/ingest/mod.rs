//! External lookups: location resolution and weather retrieval.
//!
//! The simulator core only sees the two traits defined here. Concrete
//! blocking HTTP clients live in the submodules:
//! - `open_meteo`: current weather, daily range, sunrise/sunset.
//! - `zippopotam`: US zip code to coordinates.
//!
//! Lookups are single blocking request/response calls. Nothing here retries;
//! callers decide whether and when to try again.

pub mod open_meteo;
pub mod zippopotam;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::model::{BoktaiError, ResolvedLocation, Result, WeatherRecord};

pub use open_meteo::OpenMeteoClient;
pub use zippopotam::ZippopotamClient;

/// Request timeout for the bundled HTTP clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Returns the latest weather for a resolved location.
pub trait WeatherSource {
    fn fetch(&self, location: &ResolvedLocation) -> Result<WeatherRecord>;
}

/// Resolves a US zip code to coordinates and place labels.
pub trait Geocoder {
    fn locate_zip(&self, zip: &str) -> Result<ResolvedLocation>;
}

// ---------------------------------------------------------------------------
// Location queries
// ---------------------------------------------------------------------------

/// What the user asked for: a zip code or a latitude/longitude pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Zip(String),
    Coordinates { latitude: f64, longitude: f64 },
}

impl FromStr for LocationQuery {
    type Err = BoktaiError;

    /// Accepts `"61602"` or `"40.69,-89.59"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((lat, lon)) = s.split_once(',') {
            let parse = |raw: &str| {
                raw.trim().parse::<f64>().map_err(|_| {
                    BoktaiError::InvalidLocation(format!("invalid latitude and longitude: {:?}", s))
                })
            };
            let (latitude, longitude) = (parse(lat)?, parse(lon)?);
            validate_coordinates(latitude, longitude)?;
            return Ok(LocationQuery::Coordinates { latitude, longitude });
        }
        validate_zip(s)?;
        Ok(LocationQuery::Zip(s.to_string()))
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Zip(zip) => write!(f, "{}", zip),
            LocationQuery::Coordinates { latitude, longitude } => write!(f, "{},{}", latitude, longitude),
        }
    }
}

/// Latitude must lie in [-90, 90] and longitude in [-180, 180].
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(BoktaiError::InvalidLocation(format!(
            "latitude {} outside [-90, 90]",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(BoktaiError::InvalidLocation(format!(
            "longitude {} outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

/// US zip codes are exactly five ASCII digits.
pub fn validate_zip(zip: &str) -> Result<()> {
    if zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(BoktaiError::InvalidLocation(format!("invalid zipcode provided: {:?}", zip)))
    }
}

/// Resolves a query to a location the weather source can fetch.
///
/// Coordinates are validated locally and never touch the geocoder. Their
/// place labels are the coordinates themselves, since no reverse lookup is
/// made.
pub fn resolve(query: &LocationQuery, geocoder: &dyn Geocoder) -> Result<ResolvedLocation> {
    match query {
        LocationQuery::Zip(zip) => {
            validate_zip(zip)?;
            debug!(zip = %zip, "resolving zip code");
            geocoder.locate_zip(zip)
        }
        LocationQuery::Coordinates { latitude, longitude } => {
            validate_coordinates(*latitude, *longitude)?;
            let label = format!("{:.4}, {:.4}", latitude, longitude);
            Ok(ResolvedLocation::from_coordinates(*latitude, *longitude, &label, "Lat/Lon"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
