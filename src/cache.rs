/// Process-wide observation cache.
///
/// Holds one `WeatherObservation` per location key so repeated requests for
/// the same place reuse the observation instead of resolving and fetching
/// again. An entry older than `max_age_secs` is refreshed in place on its
/// next use. Manual weather lives under `MANUAL_KEY` and is replaced on each
/// submission.
///
/// The cache is not synchronized; wrap it in a `Mutex` to share it across
/// threads.
///
/// # Clock injection
/// Every time-dependent method takes `now: DateTime<Utc>`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ingest::WeatherSource;
use crate::logging::{DataSource, log_lookup_failure, log_refresh_summary};
use crate::model::{ResolvedLocation, Result};
use crate::observation::WeatherObservation;

/// Cache key for the current manual observation.
pub const MANUAL_KEY: &str = "manual";

#[derive(Debug, Clone)]
pub struct ObservationCache {
    entries: HashMap<String, WeatherObservation>,
    max_age_secs: u64,
}

impl ObservationCache {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            max_age_secs,
        }
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&WeatherObservation> {
        self.entries.get(key)
    }

    /// Returns the cached observation for `location`, fetching it on first
    /// use and refreshing it once stale.
    ///
    /// A failed refresh leaves the cached entry as it was and returns the
    /// error; the caller decides whether to keep using the old data.
    pub fn get_or_fetch_at(
        &mut self,
        location: &ResolvedLocation,
        source: &dyn WeatherSource,
        now: DateTime<Utc>,
    ) -> Result<&WeatherObservation> {
        let max_age = self.max_age_secs;
        match self.entries.entry(location.id.clone()) {
            Entry::Occupied(entry) => {
                let observation = entry.into_mut();
                if observation.is_stale_at(max_age, now) {
                    info!(
                        location = %location.id,
                        age_secs = observation.staleness_seconds_at(now),
                        "cached weather is stale, refreshing"
                    );
                    observation.refresh_at(source, now).map_err(|e| {
                        log_lookup_failure(DataSource::Weather, &location.id, "refresh", &e);
                        e
                    })?;
                } else {
                    debug!(location = %location.id, "using cached weather");
                }
                Ok(observation)
            }
            Entry::Vacant(entry) => {
                let observation = WeatherObservation::fetch_at(location, source, now).map_err(|e| {
                    log_lookup_failure(DataSource::Weather, &location.id, "fetch", &e);
                    e
                })?;
                Ok(entry.insert(observation))
            }
        }
    }

    pub fn get_or_fetch(
        &mut self,
        location: &ResolvedLocation,
        source: &dyn WeatherSource,
    ) -> Result<&WeatherObservation> {
        self.get_or_fetch_at(location, source, Utc::now())
    }

    /// Stores a manual observation, replacing any previous one.
    pub fn insert_manual(&mut self, observation: WeatherObservation) -> &WeatherObservation {
        debug!(city = %observation.city, "caching manual weather");
        match self.entries.entry(MANUAL_KEY.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(observation);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(observation),
        }
    }

    /// Refreshes every stale entry. Returns `(successful, failed)`.
    pub fn refresh_stale_at(&mut self, source: &dyn WeatherSource, now: DateTime<Utc>) -> (usize, usize) {
        let max_age = self.max_age_secs;
        let mut total = 0;
        let mut failed = 0;
        for (key, observation) in self.entries.iter_mut() {
            if !observation.is_stale_at(max_age, now) {
                continue;
            }
            total += 1;
            if let Err(e) = observation.refresh_at(source, now) {
                log_lookup_failure(DataSource::Weather, key, "refresh", &e);
                failed += 1;
            }
        }
        if total > 0 {
            log_refresh_summary(DataSource::Weather, total, total - failed, failed);
        }
        (total - failed, failed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoktaiError, LookupFailure, WeatherRecord};
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
        fail: Cell<bool>,
        current_c: Cell<f64>,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                fail: Cell::new(false),
                current_c: Cell::new(20.0),
            }
        }
    }

    impl WeatherSource for Counting {
        fn fetch(&self, location: &ResolvedLocation) -> Result<WeatherRecord> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                return Err(LookupFailure::Http(503).into());
            }
            Ok(WeatherRecord {
                state: location.state.clone(),
                city: location.city.clone(),
                location_id: location.id.clone(),
                min_temp_c: 10.0,
                max_temp_c: 30.0,
                current_temp_c: self.current_c.get(),
                condition_code: "c".to_string(),
                sunrise: "2024-06-20T05:30:00-05:00".to_string(),
                sunset: "2024-06-20T20:30:00-05:00".to_string(),
                observed_at: "2024-06-20T12:00:00-05:00".to_string(),
            })
        }
    }

    fn peoria() -> ResolvedLocation {
        ResolvedLocation::from_coordinates(40.69, -89.59, "Peoria", "Illinois")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_first_use_fetches_then_reuses() {
        let source = Counting::new();
        let mut cache = ObservationCache::new(900);
        cache.get_or_fetch_at(&peoria(), &source, t0()).unwrap();
        cache.get_or_fetch_at(&peoria(), &source, t0() + Duration::seconds(900)).unwrap();
        assert_eq!(source.calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_entry_is_refreshed_in_place() {
        let source = Counting::new();
        let mut cache = ObservationCache::new(900);
        cache.get_or_fetch_at(&peoria(), &source, t0()).unwrap();
        source.current_c.set(25.0);
        let later = t0() + Duration::seconds(901);
        let obs = cache.get_or_fetch_at(&peoria(), &source, later).unwrap();
        assert_eq!(obs.stored_current_temp(), 25.0);
        assert_eq!(obs.last_refreshed(), later);
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_old_entry() {
        let source = Counting::new();
        let mut cache = ObservationCache::new(60);
        cache.get_or_fetch_at(&peoria(), &source, t0()).unwrap();
        source.fail.set(true);
        let err = cache
            .get_or_fetch_at(&peoria(), &source, t0() + Duration::seconds(120))
            .unwrap_err();
        assert_eq!(err, BoktaiError::Lookup(LookupFailure::Http(503)));
        let kept = cache.get(&peoria().id).expect("entry survives");
        assert_eq!(kept.last_refreshed(), t0());
        assert_eq!(kept.stored_current_temp(), 20.0);
    }

    #[test]
    fn test_failed_first_fetch_caches_nothing() {
        let source = Counting::new();
        source.fail.set(true);
        let mut cache = ObservationCache::new(60);
        assert!(cache.get_or_fetch_at(&peoria(), &source, t0()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_manual_entry_is_replaced_and_never_fetched() {
        use crate::conditions::Condition;
        use crate::manual::ManualWeather;
        use chrono::FixedOffset;

        let tz = FixedOffset::west_opt(8 * 3600).unwrap();
        let weather = |avg: f64| ManualWeather {
            state: "World of Boktai".to_string(),
            city: "San Miguel".to_string(),
            min_temp: 0.0,
            avg_temp: avg,
            max_temp: 30.0,
            current_temp: avg,
            condition: Condition::Clear,
            sunrise: tz.with_ymd_and_hms(2024, 6, 20, 5, 0, 0).unwrap(),
            sunset: tz.with_ymd_and_hms(2024, 6, 20, 20, 0, 0).unwrap(),
            observed_at: tz.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap(),
        };

        let mut cache = ObservationCache::new(60);
        cache.insert_manual(WeatherObservation::manual(weather(10.0), t0()).unwrap());
        let replaced = cache.insert_manual(WeatherObservation::manual(weather(20.0), t0()).unwrap());
        assert_eq!(replaced.avg_temp(), Some(20.0));
        assert_eq!(cache.len(), 1);

        let source = Counting::new();
        assert_eq!(cache.refresh_stale_at(&source, t0() + Duration::seconds(120)), (1, 0));
        assert_eq!(source.calls.get(), 0);
        assert!(cache.get(MANUAL_KEY).unwrap().is_manual());
    }

    #[test]
    fn test_refresh_stale_counts_outcomes() {
        let source = Counting::new();
        let mut cache = ObservationCache::new(60);
        cache.get_or_fetch_at(&peoria(), &source, t0()).unwrap();
        let tokyo = ResolvedLocation::from_coordinates(35.0, 139.0, "35.0000, 139.0000", "Lat/Lon");
        cache.get_or_fetch_at(&tokyo, &source, t0() + Duration::seconds(30)).unwrap();

        // Only Peoria is older than 60s at t0 + 61s.
        assert_eq!(cache.refresh_stale_at(&source, t0() + Duration::seconds(61)), (1, 0));

        source.fail.set(true);
        assert_eq!(cache.refresh_stale_at(&source, t0() + Duration::seconds(500)), (0, 2));
    }
}
