/// Zippopotam.us zip code lookup
///
/// Resolves a US zip code to the coordinates and labels of its first listed
/// place. Unknown zip codes come back as HTTP 404, which is reported as an
/// invalid location rather than a lookup failure.
///
/// API Documentation: https://zippopotam.us

use std::time::Duration;

use serde::Deserialize;

use super::{DEFAULT_TIMEOUT, Geocoder, validate_zip};
use crate::model::{BoktaiError, LookupFailure, ResolvedLocation, Result};

const ZIPPOPOTAM_BASE_URL: &str = "https://api.zippopotam.us";

// ============================================================================
// Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ZipResponse {
    #[serde(rename = "post code")]
    pub post_code: String,
    pub places: Vec<ZipPlace>,
}

/// Coordinates are quoted strings in this API.
#[derive(Debug, Deserialize)]
pub struct ZipPlace {
    #[serde(rename = "place name")]
    pub place_name: String,
    pub state: String,
    pub latitude: String,
    pub longitude: String,
}

// ============================================================================
// API Client
// ============================================================================

pub struct ZippopotamClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ZippopotamClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(ZIPPOPOTAM_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupFailure::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for ZippopotamClient {
    fn locate_zip(&self, zip: &str) -> Result<ResolvedLocation> {
        validate_zip(zip)?;
        let url = format!("{}/us/{}", self.base_url, zip);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| LookupFailure::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BoktaiError::InvalidLocation(format!("unknown zipcode {}", zip)));
        }
        if !status.is_success() {
            return Err(LookupFailure::Http(status.as_u16()).into());
        }

        let body: ZipResponse = response
            .json()
            .map_err(|e| LookupFailure::Parse(e.to_string()))?;
        parse_zip_response(body)
    }
}

/// Picks the first place in a zip response.
pub fn parse_zip_response(body: ZipResponse) -> Result<ResolvedLocation> {
    let place = body
        .places
        .into_iter()
        .next()
        .ok_or_else(|| BoktaiError::InvalidLocation(format!("no places for zipcode {}", body.post_code)))?;

    let coordinate = |raw: &str, what: &str| -> Result<f64> {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| LookupFailure::Parse(format!("bad {} {:?}", what, raw)).into())
    };
    let latitude = coordinate(&place.latitude, "latitude")?;
    let longitude = coordinate(&place.longitude, "longitude")?;
    super::validate_coordinates(latitude, longitude)?;

    Ok(ResolvedLocation::from_coordinates(latitude, longitude, &place.place_name, &place.state))
}

// ============================================================================
// Tests
// ============================================================================
