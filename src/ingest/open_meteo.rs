/// Open-Meteo Forecast API client
///
/// Retrieves today's temperature range, the current temperature and weather
/// code, and sunrise/sunset for a coordinate pair. No API key is required.
///
/// API Documentation: https://open-meteo.com/en/docs
///
/// Open-Meteo reports times as local wall-clock strings without an offset
/// (`"2024-06-20T05:31"`) plus a separate `utc_offset_seconds`; they are
/// recombined here into offset-aware ISO 8601 strings.

use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime};
use serde::Deserialize;

use super::{DEFAULT_TIMEOUT, WeatherSource};
use crate::conditions;
use crate::model::{LookupFailure, ResolvedLocation, Result, WeatherRecord};

const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";

// ============================================================================
// Open-Meteo API Response Structures
// ============================================================================

/// Forecast response, restricted to the fields requested by `build_forecast_url`.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub utc_offset_seconds: i32,
    pub current: CurrentConditions,
    pub daily: DailyForecast,
}

#[derive(Debug, Deserialize)]
pub struct CurrentConditions {
    pub time: String, // local, "%Y-%m-%dT%H:%M"
    #[serde(rename = "temperature_2m")]
    pub temperature_c: Option<f64>,
    #[serde(alias = "weathercode")]
    pub weather_code: Option<u16>,
}

/// Daily arrays; index 0 is today when `forecast_days=1`.
#[derive(Debug, Deserialize)]
pub struct DailyForecast {
    pub sunrise: Vec<String>,
    pub sunset: Vec<String>,
    #[serde(rename = "temperature_2m_max")]
    pub max_temp_c: Vec<Option<f64>>,
    #[serde(rename = "temperature_2m_min")]
    pub min_temp_c: Vec<Option<f64>>,
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking Open-Meteo client.
pub struct OpenMeteoClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPEN_METEO_BASE_URL, DEFAULT_TIMEOUT)
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

impl WeatherSource for OpenMeteoClient {
    fn fetch(&self, location: &ResolvedLocation) -> Result<WeatherRecord> {
        let url = build_forecast_url(&self.base_url, location.latitude, location.longitude);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| LookupFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupFailure::Http(response.status().as_u16()).into());
        }

        let forecast: ForecastResponse = response
            .json()
            .map_err(|e| LookupFailure::Parse(e.to_string()))?;

        parse_forecast(forecast, location)
    }
}

/// Builds the forecast URL for one coordinate pair.
pub fn build_forecast_url(base_url: &str, latitude: f64, longitude: f64) -> String {
    format!(
        "{}/v1/forecast?latitude={}&longitude={}\
         &current=temperature_2m,weather_code\
         &daily=temperature_2m_max,temperature_2m_min,sunrise,sunset\
         &timezone=auto&forecast_days=1",
        base_url, latitude, longitude
    )
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Converts a forecast response into the simulator's record shape.
pub fn parse_forecast(forecast: ForecastResponse, location: &ResolvedLocation) -> Result<WeatherRecord> {
    let offset = FixedOffset::east_opt(forecast.utc_offset_seconds).ok_or_else(|| {
        LookupFailure::Parse(format!("bad utc_offset_seconds {}", forecast.utc_offset_seconds))
    })?;

    let first = |values: &[String], field: &str| -> Result<String> {
        values
            .first()
            .cloned()
            .ok_or_else(|| LookupFailure::NoData(format!("daily.{} is empty", field)).into())
    };
    let first_temp = |values: &[Option<f64>], field: &str| -> Result<f64> {
        values
            .first()
            .copied()
            .flatten()
            .ok_or_else(|| LookupFailure::NoData(format!("daily.{} is empty", field)).into())
    };

    let current_temp_c = forecast
        .current
        .temperature_c
        .ok_or_else(|| LookupFailure::NoData("current.temperature_2m missing".to_string()))?;
    let code = forecast
        .current
        .weather_code
        .ok_or_else(|| LookupFailure::NoData("current.weather_code missing".to_string()))?;
    let condition = conditions::from_wmo_code(code)
        .ok_or_else(|| LookupFailure::Parse(format!("unknown WMO weather code {}", code)))?;

    Ok(WeatherRecord {
        state: location.state.clone(),
        city: location.city.clone(),
        location_id: location.id.clone(),
        min_temp_c: first_temp(&forecast.daily.min_temp_c, "temperature_2m_min")?,
        max_temp_c: first_temp(&forecast.daily.max_temp_c, "temperature_2m_max")?,
        current_temp_c,
        condition_code: condition.code().to_string(),
        sunrise: with_offset(&first(&forecast.daily.sunrise, "sunrise")?, offset)?,
        sunset: with_offset(&first(&forecast.daily.sunset, "sunset")?, offset)?,
        observed_at: with_offset(&forecast.current.time, offset)?,
    })
}

/// Attaches `offset` to a local `"%Y-%m-%dT%H:%M"` string and renders RFC 3339.
fn with_offset(local: &str, offset: FixedOffset) -> Result<String> {
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M")
        .map_err(|e| LookupFailure::Parse(format!("bad local time {:?}: {}", local, e)))?;
    let aware = naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| LookupFailure::Parse(format!("ambiguous local time {:?}", local)))?;
    Ok(aware.to_rfc3339())
}

// ============================================================================
// Tests
// ============================================================================
