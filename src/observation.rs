/// Weather observations.
///
/// A `WeatherObservation` is the simulator's view of the weather at one
/// location: today's temperature range, the current temperature, the
/// condition, and sunrise/sunset. It is built either from a `WeatherRecord`
/// returned by a `WeatherSource`, or from user-authored manual weather.
///
/// The bound invariant `min_temp <= current_temp <= max_temp` is enforced by
/// widening the range on construction and on every refresh.
///
/// # Clock injection
/// Functions that depend on the time take a `now: DateTime<Utc>` parameter;
/// the un-suffixed variants call `Utc::now()` and exist for callers outside
/// tests.

use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use rand_distr::{Distribution, Triangular};
use tracing::{debug, info};

use crate::conditions::{Condition, WeatherClass};
use crate::ingest::WeatherSource;
use crate::manual::ManualWeather;
use crate::model::{BoktaiError, LookupFailure, ResolvedLocation, Result, WeatherRecord};
use crate::sun::{self, SunPhase, SunPosition};
use crate::units::{c_to_f, round2};

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub state: String,
    pub city: String,
    /// Where to re-fetch from. `None` for manual observations.
    location: Option<ResolvedLocation>,
    min_temp: f64,
    max_temp: f64,
    current_temp: f64,
    /// Mode of the triangular draw for manual observations.
    avg_temp: Option<f64>,
    condition: Condition,
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
    observed_at: DateTime<FixedOffset>,
    manual: bool,
    last_refreshed: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl WeatherObservation {
    /// Builds a looked-up observation from a weather source record.
    ///
    /// Malformed timestamps or an unknown condition code are reported as a
    /// `LookupFailure::Parse`, since the record came from outside.
    pub fn from_record(
        record: WeatherRecord,
        location: ResolvedLocation,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let parsed = ParsedRecord::parse(&record)?;
        let mut observation = Self {
            state: record.state,
            city: record.city,
            location: Some(location),
            min_temp: record.min_temp_c,
            max_temp: record.max_temp_c,
            current_temp: record.current_temp_c,
            avg_temp: None,
            condition: parsed.condition,
            sunrise: parsed.sunrise,
            sunset: parsed.sunset,
            observed_at: parsed.observed_at,
            manual: false,
            last_refreshed: now,
        };
        observation.expand_bounds();
        Ok(observation)
    }

    /// Fetches the latest record for `location` and builds an observation.
    pub fn fetch_at(
        location: &ResolvedLocation,
        source: &dyn WeatherSource,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let record = source.fetch(location)?;
        info!(location = %location.id, city = %record.city, "fetched weather");
        Self::from_record(record, location.clone(), now)
    }

    /// Builds a manual observation. `weather` is validated first.
    pub fn manual(weather: ManualWeather, now: DateTime<Utc>) -> Result<Self> {
        weather.validate()?;
        let mut observation = Self {
            state: weather.state,
            city: weather.city,
            location: None,
            min_temp: weather.min_temp,
            max_temp: weather.max_temp,
            current_temp: weather.current_temp,
            avg_temp: Some(weather.avg_temp),
            condition: weather.condition,
            sunrise: weather.sunrise,
            sunset: weather.sunset,
            observed_at: weather.observed_at,
            manual: true,
            last_refreshed: now,
        };
        observation.expand_bounds();
        Ok(observation)
    }

    fn expand_bounds(&mut self) {
        if self.current_temp > self.max_temp {
            self.max_temp = self.current_temp;
        }
        if self.current_temp < self.min_temp {
            self.min_temp = self.current_temp;
        }
    }
}

struct ParsedRecord {
    condition: Condition,
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
    observed_at: DateTime<FixedOffset>,
}

impl ParsedRecord {
    fn parse(record: &WeatherRecord) -> Result<Self> {
        let condition = record
            .condition_code
            .parse::<Condition>()
            .map_err(LookupFailure::Parse)?;
        Ok(Self {
            condition,
            sunrise: parse_timestamp(&record.sunrise)?,
            sunset: parse_timestamp(&record.sunset)?,
            observed_at: parse_timestamp(&record.observed_at)?,
        })
    }
}

/// Parses an ISO 8601 timestamp with offset. Accepts both `+05:00` and
/// `+0500` style offsets.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|e| LookupFailure::Parse(format!("bad timestamp {:?}: {}", raw, e)).into())
}

// ---------------------------------------------------------------------------
// Refresh and staleness
// ---------------------------------------------------------------------------

impl WeatherObservation {
    /// Re-fetches the latest weather for this observation's location.
    ///
    /// Manual observations only have their refresh time touched. Lookup
    /// failures are returned unchanged and leave the observation untouched.
    pub fn refresh_at(&mut self, source: &dyn WeatherSource, now: DateTime<Utc>) -> Result<()> {
        let Some(location) = self.location.as_ref().filter(|_| !self.manual) else {
            debug!(city = %self.city, "manual observation, refresh only touches timestamp");
            self.last_refreshed = now;
            return Ok(());
        };

        let record = source.fetch(location)?;
        let parsed = ParsedRecord::parse(&record)?;
        info!(location = %location.id, condition = %parsed.condition, "refreshed weather");

        self.condition = parsed.condition;
        self.sunrise = parsed.sunrise;
        self.sunset = parsed.sunset;
        self.observed_at = parsed.observed_at;
        self.min_temp = record.min_temp_c;
        self.max_temp = record.max_temp_c;
        self.current_temp = record.current_temp_c;
        self.expand_bounds();
        self.last_refreshed = now;
        Ok(())
    }

    pub fn refresh(&mut self, source: &dyn WeatherSource) -> Result<()> {
        self.refresh_at(source, Utc::now())
    }

    /// Whole seconds since the last construction or successful refresh.
    pub fn staleness_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_refreshed).num_seconds()
    }

    pub fn staleness_seconds(&self) -> i64 {
        self.staleness_seconds_at(Utc::now())
    }

    /// Staleness is strictly greater than the threshold:
    ///   age > max_age_secs  →  stale
    ///   age == max_age_secs →  not stale
    pub fn is_stale_at(&self, max_age_secs: u64, now: DateTime<Utc>) -> bool {
        self.staleness_seconds_at(now) > max_age_secs as i64
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

impl WeatherObservation {
    /// The current temperature in Celsius.
    ///
    /// Manual observations draw a fresh sample from a triangular
    /// distribution over `(min_temp, max_temp)` with mode `avg_temp` on every
    /// call, rounded to two decimals. Looked-up observations return the
    /// stored value.
    pub fn current_temperature<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        match (self.manual, self.avg_temp) {
            (true, Some(_)) if self.min_temp == self.max_temp => Ok(self.min_temp),
            (true, Some(avg)) => {
                let dist = Triangular::new(self.min_temp, self.max_temp, avg)
                    .map_err(|e| BoktaiError::Range(format!("manual temperature draw: {}", e)))?;
                Ok(round2(dist.sample(rng)))
            }
            _ => Ok(self.current_temp),
        }
    }

    /// Last stored current temperature, without resampling.
    pub fn stored_current_temp(&self) -> f64 {
        self.current_temp
    }

    pub fn min_temp(&self) -> f64 {
        self.min_temp
    }

    pub fn max_temp(&self) -> f64 {
        self.max_temp
    }

    pub fn avg_temp(&self) -> Option<f64> {
        self.avg_temp
    }

    pub fn min_temp_f(&self) -> f64 {
        round2(c_to_f(self.min_temp))
    }

    pub fn max_temp_f(&self) -> f64 {
        round2(c_to_f(self.max_temp))
    }

    pub fn current_temp_f<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        Ok(round2(c_to_f(self.current_temperature(rng)?)))
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn weather_class(&self) -> &'static WeatherClass {
        self.condition.class()
    }

    pub fn sunrise(&self) -> DateTime<FixedOffset> {
        self.sunrise
    }

    pub fn sunset(&self) -> DateTime<FixedOffset> {
        self.sunset
    }

    pub fn observed_at(&self) -> DateTime<FixedOffset> {
        self.observed_at
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.location.as_ref()
    }

    pub fn last_refreshed(&self) -> DateTime<Utc> {
        self.last_refreshed
    }

    pub fn sun_position_at(&self, now: DateTime<Utc>) -> SunPosition {
        sun::sun_position_at(self.sunrise, self.sunset, now)
    }

    pub fn sun_phase_at(&self, now: DateTime<Utc>) -> SunPhase {
        self.sun_position_at(now).phase()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;

    struct Scripted {
        records: RefCell<Vec<Result<WeatherRecord>>>,
    }

    impl Scripted {
        fn new(records: Vec<Result<WeatherRecord>>) -> Self {
            Self { records: RefCell::new(records) }
        }
    }

    impl WeatherSource for Scripted {
        fn fetch(&self, _location: &ResolvedLocation) -> Result<WeatherRecord> {
            self.records.borrow_mut().remove(0)
        }
    }

    fn peoria() -> ResolvedLocation {
        ResolvedLocation::from_coordinates(40.69, -89.59, "Peoria", "Illinois")
    }

    fn record(min: f64, current: f64, max: f64, code: &str) -> WeatherRecord {
        WeatherRecord {
            state: "Illinois".to_string(),
            city: "Peoria".to_string(),
            location_id: "40.69,-89.59".to_string(),
            min_temp_c: min,
            max_temp_c: max,
            current_temp_c: current,
            condition_code: code.to_string(),
            sunrise: "2024-06-20T05:30:00-05:00".to_string(),
            sunset: "2024-06-20T20:30:00-05:00".to_string(),
            observed_at: "2024-06-20T12:00:00.000-05:00".to_string(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 17, 0, 0).unwrap()
    }

    fn manual_weather(min: f64, avg: f64, max: f64) -> ManualWeather {
        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        ManualWeather {
            state: "World of Boktai".to_string(),
            city: "San Miguel".to_string(),
            min_temp: min,
            avg_temp: avg,
            max_temp: max,
            current_temp: avg,
            condition: Condition::Clear,
            sunrise: tz.with_ymd_and_hms(2021, 6, 20, 4, 19, 57).unwrap(),
            sunset: tz.with_ymd_and_hms(2021, 6, 20, 23, 42, 8).unwrap(),
            observed_at: tz.with_ymd_and_hms(2021, 6, 20, 22, 32, 22).unwrap(),
        }
    }

    // --- Construction -------------------------------------------------------

    #[test]
    fn test_current_above_max_raises_max() {
        let obs = WeatherObservation::from_record(record(10.0, 31.0, 28.0, "c"), peoria(), fixed_now())
            .expect("valid record");
        assert_eq!(obs.max_temp(), 31.0);
        assert_eq!(obs.min_temp(), 10.0);
    }

    #[test]
    fn test_current_below_min_lowers_min() {
        let obs = WeatherObservation::from_record(record(10.0, 4.5, 28.0, "c"), peoria(), fixed_now())
            .expect("valid record");
        assert_eq!(obs.min_temp(), 4.5);
        assert_eq!(obs.max_temp(), 28.0);
    }

    #[test]
    fn test_unknown_condition_code_is_parse_failure() {
        let err = WeatherObservation::from_record(record(1.0, 2.0, 3.0, "zz"), peoria(), fixed_now())
            .unwrap_err();
        assert!(
            matches!(err, BoktaiError::Lookup(LookupFailure::Parse(_))),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_bad_timestamp_is_parse_failure() {
        let mut bad = record(1.0, 2.0, 3.0, "c");
        bad.sunrise = "not-a-datetime".to_string();
        let err = WeatherObservation::from_record(bad, peoria(), fixed_now()).unwrap_err();
        assert!(matches!(err, BoktaiError::Lookup(LookupFailure::Parse(_))));
    }

    #[test]
    fn test_offset_without_colon_parses() {
        let ts = parse_timestamp("2021-06-20T04:19:57.380989-0800").expect("compact offset");
        assert_eq!(ts.offset().local_minus_utc(), -8 * 3600);
    }

    #[test]
    fn test_fahrenheit_views_are_rounded() {
        let obs = WeatherObservation::from_record(record(12.0, 21.3, 30.0, "c"), peoria(), fixed_now())
            .unwrap();
        assert_eq!(obs.min_temp_f(), 53.6);
        assert_eq!(obs.max_temp_f(), 86.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(obs.current_temp_f(&mut rng).unwrap(), 70.34);
    }

    // --- Refresh ------------------------------------------------------------

    #[test]
    fn test_refresh_overwrites_and_keeps_invariant() {
        let source = Scripted::new(vec![Ok(record(15.0, 35.0, 30.0, "t"))]);
        let mut obs = WeatherObservation::from_record(record(10.0, 20.0, 28.0, "c"), peoria(), fixed_now())
            .unwrap();
        let later = fixed_now() + Duration::minutes(20);
        obs.refresh_at(&source, later).expect("refresh should succeed");

        assert_eq!(obs.condition(), Condition::Thunderstorm);
        assert_eq!(obs.max_temp(), 35.0);
        assert!(obs.min_temp() <= obs.stored_current_temp() && obs.stored_current_temp() <= obs.max_temp());
        assert_eq!(obs.last_refreshed(), later);
    }

    #[test]
    fn test_failed_refresh_leaves_observation_untouched() {
        let source = Scripted::new(vec![Err(LookupFailure::Http(502).into())]);
        let mut obs = WeatherObservation::from_record(record(10.0, 20.0, 28.0, "c"), peoria(), fixed_now())
            .unwrap();
        let before = obs.clone();
        let err = obs.refresh_at(&source, fixed_now() + Duration::hours(1)).unwrap_err();
        assert_eq!(err, BoktaiError::Lookup(LookupFailure::Http(502)));
        assert_eq!(obs, before);
    }

    #[test]
    fn test_manual_refresh_never_calls_source() {
        let source = Scripted::new(Vec::new());
        let mut obs = WeatherObservation::manual(manual_weather(0.0, 20.0, 35.0), fixed_now()).unwrap();
        let later = fixed_now() + Duration::hours(2);
        obs.refresh_at(&source, later).expect("manual refresh cannot fail");
        assert_eq!(obs.last_refreshed(), later);
        assert_eq!(obs.condition(), Condition::Clear);
    }

    // --- Staleness ----------------------------------------------------------

    #[test]
    fn test_staleness_is_strictly_greater_than_threshold() {
        let obs = WeatherObservation::from_record(record(10.0, 20.0, 28.0, "c"), peoria(), fixed_now())
            .unwrap();
        let at_threshold = fixed_now() + Duration::seconds(900);
        let past_threshold = fixed_now() + Duration::seconds(901);
        assert_eq!(obs.staleness_seconds_at(at_threshold), 900);
        assert!(!obs.is_stale_at(900, at_threshold), "age == threshold is not stale");
        assert!(obs.is_stale_at(900, past_threshold));
    }

    // --- Manual sampling ----------------------------------------------------

    #[test]
    fn test_manual_current_temperature_is_resampled() {
        let obs = WeatherObservation::manual(manual_weather(0.0, 20.0, 35.0), fixed_now()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20)
            .map(|_| obs.current_temperature(&mut rng).unwrap())
            .collect();
        assert!(samples.iter().all(|t| (0.0..=35.0).contains(t)));
        assert!(
            samples.windows(2).any(|w| w[0] != w[1]),
            "manual reads should not be constant: {:?}",
            samples
        );
        for t in &samples {
            assert_eq!(*t, round2(*t), "sample should be rounded to 2 decimals");
        }
    }

    #[test]
    fn test_looked_up_current_temperature_is_stable() {
        let obs = WeatherObservation::from_record(record(10.0, 20.0, 28.0, "c"), peoria(), fixed_now())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(obs.current_temperature(&mut rng).unwrap(), 20.0);
        assert_eq!(obs.current_temperature(&mut rng).unwrap(), 20.0);
    }

    #[test]
    fn test_manual_rejects_avg_outside_range() {
        let err = WeatherObservation::manual(manual_weather(10.0, 5.0, 20.0), fixed_now()).unwrap_err();
        assert!(matches!(err, BoktaiError::InvalidManualInput(_)));
    }
}
