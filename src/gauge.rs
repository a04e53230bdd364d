/// The solar gauge engine.
///
/// Four signals, each on a 0–10 scale, are computed per read:
///
/// | signal      | source                                                     |
/// |-------------|------------------------------------------------------------|
/// | temperature | current temperature's position within today's range        |
/// | weather     | same position, remapped onto the condition's gauge range   |
/// | sun         | Beta draw whose shape follows the sun position             |
/// | random      | triangular draw over the condition's gauge range           |
///
/// They are blended by fixed weights (the sun dominates), nudged by the
/// condition modifier, clamped, and rescaled to the game's gauge capacity.
/// At night the reading is zero, or half the blend in lunar mode.
///
/// Every random draw comes from the caller's `Rng`; seed it for
/// reproducible reads.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Beta, Distribution, Triangular};
use tracing::debug;

use crate::conditions::WeatherClass;
use crate::model::{BoktaiError, GameVersion, Result};
use crate::observation::WeatherObservation;
use crate::scaling::scale;
use crate::sun::SunPosition;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Relative weight of each signal in the blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureWeights {
    pub temperature: f64,
    pub weather: f64,
    pub sun: f64,
    pub random: f64,
}

pub const FEATURE_WEIGHTS: FeatureWeights = FeatureWeights {
    temperature: 10.0,
    weather: 20.0,
    sun: 40.0,
    random: 25.0,
};

impl FeatureWeights {
    pub fn total(&self) -> f64 {
        self.temperature + self.weather + self.sun + self.random
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// One read's worth of signals. Random signals are drawn exactly once and
/// kept here so the blend and any diagnostics see the same values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeSignals {
    pub temperature: f64,
    pub weather: f64,
    pub sun: f64,
    pub random: f64,
}

impl GaugeSignals {
    pub fn weighted_average(&self, weights: &FeatureWeights) -> f64 {
        let sum = self.temperature * weights.temperature
            + self.weather * weights.weather
            + self.sun * weights.sun
            + self.random * weights.random;
        sum / weights.total()
    }
}

// ---------------------------------------------------------------------------
// Sun curve
// ---------------------------------------------------------------------------

/// Shape parameter bounds for the sun-value Beta draw, in hundredths.
///
/// Alpha sweeps from `alpha_min` at sunrise/sunset to `alpha_max` at solar
/// noon, which pushes the distribution's mean up through the day. Equal
/// bounds hold a parameter constant at `max / 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunCurve {
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub beta_min: f64,
    pub beta_max: f64,
}

impl Default for SunCurve {
    fn default() -> Self {
        Self {
            alpha_min: 225.0,
            alpha_max: 550.0,
            beta_min: 225.0,
            beta_max: 225.0,
        }
    }
}

impl SunCurve {
    fn shape(min: f64, max: f64, position: f64) -> Result<f64> {
        if min < max {
            Ok(scale(0.0, 100.0, min, max, position)? / 100.0)
        } else {
            Ok(max / 100.0)
        }
    }
}

/// Positions at or below this (after mirroring) are "at the horizon".
const HORIZON_POSITION: f64 = 5.0;

/// Draws a sun value with the default curve. See [`sun_value_with`].
pub fn sun_value<R: Rng + ?Sized>(position: SunPosition, rng: &mut R) -> Result<f64> {
    sun_value_with(position, &SunCurve::default(), rng)
}

/// Draws a noisy 0–10 sun value for `position`.
///
/// Night positions return 0 without touching `rng`. The curve is symmetric
/// around solar noon. Near the horizon, draws above 2 are knocked down by 2
/// so sunrise and sunset do not spike.
pub fn sun_value_with<R: Rng + ?Sized>(position: SunPosition, curve: &SunCurve, rng: &mut R) -> Result<f64> {
    if position.is_night() {
        return Ok(0.0);
    }
    let mut pos = position.percent();
    if pos > 50.0 {
        pos = 100.0 - pos;
    }

    let alpha = SunCurve::shape(curve.alpha_min, curve.alpha_max, pos)?;
    let beta = SunCurve::shape(curve.beta_min, curve.beta_max, pos)?;
    let dist = Beta::new(alpha, beta)
        .map_err(|e| BoktaiError::Range(format!("sun curve Beta({}, {}): {}", alpha, beta, e)))?;

    let mut value = dist.sample(rng) * 10.0;
    if pos <= HORIZON_POSITION && value > 2.0 {
        value -= 2.0;
    }
    Ok(value)
}

/// One triangular draw over the weather class's gauge range.
pub fn random_weather_value<R: Rng + ?Sized>(class: &WeatherClass, rng: &mut R) -> Result<f64> {
    let dist = Triangular::new(class.min, class.max, class.avg)
        .map_err(|e| BoktaiError::Range(format!("{} weather draw: {}", class.name, e)))?;
    Ok(dist.sample(rng))
}

// ---------------------------------------------------------------------------
// Blend
// ---------------------------------------------------------------------------

/// Maps a 0–10 score onto the version's gauge: 0–8 for Boktai 1, unchanged
/// otherwise.
pub fn rescale(version: GameVersion, value: f64) -> Result<f64> {
    match version {
        GameVersion::One => scale(0.0, 10.0, 0.0, 8.0, value),
        GameVersion::Two | GameVersion::Three => Ok(value),
    }
}

fn to_segments(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, u8::MAX as f64) as u8
}

/// Blends one read's signals into the final gauge value.
///
/// - lunar mode at night: `round(rescale(weighted_avg / 2))`
/// - night otherwise: 0
/// - day: `round(rescale(clamp(weighted_avg + modifier, 0, 10)))`
pub fn blend(
    signals: &GaugeSignals,
    position: SunPosition,
    modifier: f64,
    version: GameVersion,
    lunar_mode: bool,
) -> Result<u8> {
    let weighted = signals.weighted_average(&FEATURE_WEIGHTS);
    debug!(weighted, position = position.percent(), "blended signals");

    if position.is_night() {
        if lunar_mode {
            return Ok(to_segments(rescale(version, weighted / 2.0)?));
        }
        return Ok(0);
    }

    let clamped = (weighted + modifier).clamp(0.0, 10.0);
    let value = to_segments(rescale(version, clamped)?);
    debug!(value, "final bar value");
    Ok(value)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything produced by one gauge read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeRead {
    pub value: u8,
    pub signals: GaugeSignals,
    pub position: SunPosition,
}

/// A gauge bound to one observation, game version, and lunar setting.
#[derive(Debug, Clone)]
pub struct GaugeSession {
    version: GameVersion,
    lunar_mode: bool,
    observation: WeatherObservation,
}

impl GaugeSession {
    pub fn new(version: GameVersion, lunar_mode: bool, observation: WeatherObservation) -> Self {
        Self {
            version,
            lunar_mode,
            observation,
        }
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn lunar_mode(&self) -> bool {
        self.lunar_mode
    }

    pub fn observation(&self) -> &WeatherObservation {
        &self.observation
    }

    /// Swaps in another observation, e.g. a refreshed one from the cache.
    pub fn replace_observation(&mut self, observation: WeatherObservation) {
        self.observation = observation;
    }

    pub fn weather_class(&self) -> &'static WeatherClass {
        self.observation.weather_class()
    }

    /// Current temperature's position in today's range, on 0–10.
    pub fn temperature_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let obs = &self.observation;
        scale(obs.min_temp(), obs.max_temp(), 0.0, 10.0, obs.current_temperature(rng)?)
    }

    /// Current temperature's position, remapped onto the condition's range.
    pub fn weather_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let obs = &self.observation;
        let class = self.weather_class();
        scale(obs.min_temp(), obs.max_temp(), class.min, class.max, obs.current_temperature(rng)?)
    }

    pub fn random_weather_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        random_weather_value(self.weather_class(), rng)
    }

    pub fn sun_position_at(&self, now: DateTime<Utc>) -> SunPosition {
        self.observation.sun_position_at(now)
    }

    pub fn sun_value_at<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> Result<f64> {
        sun_value(self.sun_position_at(now), rng)
    }

    /// Computes all four signals for a given sun position, drawing each
    /// random signal once.
    pub fn signals_for<R: Rng + ?Sized>(&self, position: SunPosition, rng: &mut R) -> Result<GaugeSignals> {
        let signals = GaugeSignals {
            temperature: self.temperature_value(rng)?,
            weather: self.weather_value(rng)?,
            sun: sun_value(position, rng)?,
            random: self.random_weather_value(rng)?,
        };
        debug!(?signals, "generated values");
        Ok(signals)
    }

    /// Reads the gauge as if the sun were at `position`.
    pub fn read_for_position<R: Rng + ?Sized>(&self, position: SunPosition, rng: &mut R) -> Result<GaugeRead> {
        let signals = self.signals_for(position, rng)?;
        let value = blend(
            &signals,
            position,
            self.weather_class().modifier,
            self.version,
            self.lunar_mode,
        )?;
        Ok(GaugeRead { value, signals, position })
    }

    pub fn read_at<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> Result<GaugeRead> {
        self.read_for_position(self.sun_position_at(now), rng)
    }

    /// The gauge value at `now`: 0–8 for Boktai 1, 0–10 otherwise.
    pub fn current_reading_at<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> Result<u8> {
        Ok(self.read_at(now, rng)?.value)
    }

    pub fn current_reading<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u8> {
        self.current_reading_at(Utc::now(), rng)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::Condition;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// Fails the test if any randomness is consulted.
    struct NoRandom;

    impl RngCore for NoRandom {
        fn next_u32(&mut self) -> u32 {
            panic!("randomness consulted");
        }
        fn next_u64(&mut self) -> u64 {
            panic!("randomness consulted");
        }
        fn fill_bytes(&mut self, _dst: &mut [u8]) {
            panic!("randomness consulted");
        }
    }

    fn signals(t: f64, w: f64, s: f64, r: f64) -> GaugeSignals {
        GaugeSignals { temperature: t, weather: w, sun: s, random: r }
    }

    fn mean_sun(position: f64, seed: u64, n: usize) -> f64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let total: f64 = (0..n)
            .map(|_| sun_value(SunPosition::new(position), &mut rng).unwrap())
            .sum();
        total / n as f64
    }

    // --- Sun value ----------------------------------------------------------

    #[test]
    fn test_sun_value_is_zero_at_night_without_randomness() {
        assert_eq!(sun_value(SunPosition::SUNSET, &mut NoRandom).unwrap(), 0.0);
        assert_eq!(sun_value(SunPosition::NIGHT, &mut NoRandom).unwrap(), 0.0);
        assert_eq!(sun_value(SunPosition::new(-1.0), &mut NoRandom).unwrap(), 0.0);
    }

    #[test]
    fn test_sun_value_stays_on_gauge_scale() {
        let mut rng = StdRng::seed_from_u64(3);
        for p in [0.0, 2.5, 5.0, 17.0, 50.0, 83.0, 99.9] {
            for _ in 0..200 {
                let v = sun_value(SunPosition::new(p), &mut rng).unwrap();
                assert!((0.0..=10.0).contains(&v), "position {} drew {}", p, v);
            }
        }
    }

    #[test]
    fn test_sun_value_is_symmetric_around_noon() {
        // Mirroring happens before any draw, so identical seeds give
        // identical values for p and 100 - p.
        for p in [12.0, 30.0, 45.0] {
            let mut a = StdRng::seed_from_u64(99);
            let mut b = StdRng::seed_from_u64(99);
            for _ in 0..50 {
                assert_eq!(
                    sun_value(SunPosition::new(p), &mut a).unwrap(),
                    sun_value(SunPosition::new(100.0 - p), &mut b).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_sun_mean_rises_toward_noon() {
        let morning = mean_sun(10.0, 5, 4000);
        let noon = mean_sun(50.0, 5, 4000);
        // Beta means: 2.575/(2.575+2.25) ≈ 0.534 vs 3.875/(3.875+2.25) ≈ 0.633.
        assert_relative_eq!(morning, 5.34, epsilon = 0.25);
        assert_relative_eq!(noon, 6.33, epsilon = 0.25);
        assert!(noon > morning);
    }

    #[test]
    fn test_horizon_suppression_lowers_mean() {
        let horizon = mean_sun(5.0, 8, 4000);
        let just_after = mean_sun(5.5, 8, 4000);
        assert!(horizon + 1.0 < just_after, "horizon {} vs {}", horizon, just_after);
    }

    #[test]
    fn test_constant_curve_uses_max_over_100() {
        let curve = SunCurve { alpha_min: 300.0, alpha_max: 300.0, beta_min: 300.0, beta_max: 300.0 };
        let mut rng = StdRng::seed_from_u64(21);
        let n = 4000;
        let mean: f64 = (0..n)
            .map(|_| sun_value_with(SunPosition::new(40.0), &curve, &mut rng).unwrap())
            .sum::<f64>()
            / n as f64;
        assert_relative_eq!(mean, 5.0, epsilon = 0.2);
    }

    // --- Random weather value -----------------------------------------------

    #[test]
    fn test_random_weather_value_stays_in_class_range() {
        let mut rng = StdRng::seed_from_u64(4);
        for condition in [Condition::Clear, Condition::Thunderstorm, Condition::Showers] {
            let class = condition.class();
            for _ in 0..200 {
                let v = random_weather_value(class, &mut rng).unwrap();
                assert!(v >= class.min && v <= class.max, "{} drew {}", class.name, v);
            }
        }
    }

    // --- Blend --------------------------------------------------------------

    #[test]
    fn test_weights_total_95() {
        assert_eq!(FEATURE_WEIGHTS.total(), 95.0);
        let avg = signals(1.0, 2.0, 3.0, 4.0).weighted_average(&FEATURE_WEIGHTS);
        assert_relative_eq!(avg, (10.0 + 40.0 + 120.0 + 100.0) / 95.0);
    }

    #[test]
    fn test_night_without_lunar_is_zero() {
        let s = signals(10.0, 10.0, 10.0, 10.0);
        assert_eq!(blend(&s, SunPosition::SUNSET, 1.0, GameVersion::Two, false).unwrap(), 0);
        assert_eq!(blend(&s, SunPosition::NIGHT, 1.0, GameVersion::Two, false).unwrap(), 0);
    }

    #[test]
    fn test_lunar_night_halves_blend_and_ignores_modifier() {
        let s = signals(8.0, 8.0, 8.0, 8.0);
        assert_eq!(blend(&s, SunPosition::SUNSET, -2.0, GameVersion::Two, true).unwrap(), 4);
        // Boktai 1: 4.0 -> 3.2 -> 3
        assert_eq!(blend(&s, SunPosition::NIGHT, 1.0, GameVersion::One, true).unwrap(), 3);
    }

    #[test]
    fn test_day_blend_applies_modifier_and_clamps() {
        let s = signals(9.5, 9.5, 9.5, 9.5);
        assert_eq!(blend(&s, SunPosition::new(50.0), 1.0, GameVersion::Three, false).unwrap(), 10);
        let low = signals(0.5, 0.5, 0.5, 0.5);
        assert_eq!(blend(&low, SunPosition::new(50.0), -2.0, GameVersion::Two, false).unwrap(), 0);
    }

    #[test]
    fn test_version_one_caps_at_eight() {
        let s = signals(10.0, 10.0, 10.0, 10.0);
        assert_eq!(blend(&s, SunPosition::new(40.0), 1.0, GameVersion::One, false).unwrap(), 8);
        assert_eq!(rescale(GameVersion::One, 5.0).unwrap(), 4.0);
        assert_eq!(rescale(GameVersion::Two, 5.0).unwrap(), 5.0);
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        // 2.5 rounds to 2, 3.5 rounds to 4.
        let two_and_half = signals(2.5, 2.5, 2.5, 2.5);
        assert_eq!(blend(&two_and_half, SunPosition::new(50.0), 0.0, GameVersion::Two, false).unwrap(), 2);
        let three_and_half = signals(3.5, 3.5, 3.5, 3.5);
        assert_eq!(blend(&three_and_half, SunPosition::new(50.0), 0.0, GameVersion::Two, false).unwrap(), 4);
    }
}
