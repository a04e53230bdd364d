/// Sun position geometry.
///
/// The sun position is the percentage of today's daylight that has elapsed:
/// 0 at sunrise, 100 at (or after) sunset, and the sentinel -1 when it is
/// undefined (before sunrise, or a degenerate sunrise/sunset pair). Both 100
/// and -1 mean "night" to every consumer.
///
/// # Clock injection
/// `sun_position_at` takes `now` explicitly rather than calling `Utc::now()`
/// so tests can pin the clock.

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

use crate::scaling::scale;

// ---------------------------------------------------------------------------
// Sun position
// ---------------------------------------------------------------------------

/// Percentage of daylight elapsed, or one of the two night values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SunPosition(f64);

impl SunPosition {
    /// Undefined position (before sunrise).
    pub const NIGHT: SunPosition = SunPosition(-1.0);
    /// At or after sunset.
    pub const SUNSET: SunPosition = SunPosition(100.0);

    /// Wraps a raw percentage. Anything below 0 (or NaN) collapses to
    /// [`SunPosition::NIGHT`], anything above 100 to [`SunPosition::SUNSET`].
    pub fn new(percent: f64) -> Self {
        if percent.is_nan() || percent < 0.0 {
            SunPosition::NIGHT
        } else if percent > 100.0 {
            SunPosition::SUNSET
        } else {
            SunPosition(percent)
        }
    }

    pub fn percent(self) -> f64 {
        self.0
    }

    /// True for the sunset value 100 and the undefined sentinel -1.
    pub fn is_night(self) -> bool {
        self.0 == 100.0 || self.0 == -1.0
    }

    pub fn phase(self) -> SunPhase {
        let p = self.0;
        if (0.0..=30.0).contains(&p) {
            SunPhase::Rising
        } else if p > 30.0 && p <= 70.0 {
            SunPhase::AtApex
        } else if p > 70.0 && p <= 99.9 {
            SunPhase::Descending
        } else {
            SunPhase::Moonlight
        }
    }
}

impl fmt::Display for SunPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// Coarse day phase derived from a [`SunPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunPhase {
    Rising,
    AtApex,
    Descending,
    Moonlight,
}

impl fmt::Display for SunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SunPhase::Rising => write!(f, "Rising"),
            SunPhase::AtApex => write!(f, "At Apex"),
            SunPhase::Descending => write!(f, "Descending"),
            SunPhase::Moonlight => write!(f, "Moonlight"),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

fn whole_seconds(delta: chrono::TimeDelta) -> f64 {
    (delta.num_milliseconds() as f64 / 1000.0).round_ties_even()
}

/// Computes the sun position for `now` given today's sunrise and sunset.
///
/// After sunset the elapsed time exceeds the daylight span and the scaling
/// widens to exactly 100. Before sunrise the elapsed time is negative, the
/// scaling precondition fails, and the result is [`SunPosition::NIGHT`].
pub fn sun_position_at(
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
    now: DateTime<Utc>,
) -> SunPosition {
    let daylight = whole_seconds(sunset - sunrise);
    if daylight <= 0.0 {
        return SunPosition::NIGHT;
    }
    let remaining = whole_seconds(sunset.with_timezone(&Utc) - now);
    let elapsed = daylight - remaining;

    match scale(0.0, daylight, 0.0, 100.0, elapsed) {
        Ok(percent) => SunPosition::new(percent),
        Err(_) => SunPosition::NIGHT,
    }
}

/// Convenience wrapper that uses the real current time.
pub fn sun_position(sunrise: DateTime<FixedOffset>, sunset: DateTime<FixedOffset>) -> SunPosition {
    sun_position_at(sunrise, sunset, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
