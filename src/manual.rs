/// Manual (user-authored) weather.
///
/// When no lookup is wanted, or the lookup services are unreachable, the user
/// types in a temperature range, a weather condition, and sunrise/sunset
/// times. `ManualForm` holds those raw entries; `ManualForm::parse_at` turns
/// them into a validated `ManualWeather` in Celsius, ready for
/// `WeatherObservation::manual`.

use chrono::{DateTime, FixedOffset, NaiveTime};

use crate::conditions::Condition;
use crate::model::{BoktaiError, GameVersion, Result};
use crate::units::{TempScale, f_to_c, round2};

/// Region label shown for manual weather.
pub const MANUAL_STATE: &str = "World of Boktai";

// ---------------------------------------------------------------------------
// Validated manual weather
// ---------------------------------------------------------------------------

/// Manual weather in Celsius with offset-aware sun times.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualWeather {
    pub state: String,
    pub city: String,
    pub min_temp: f64,
    pub avg_temp: f64,
    pub max_temp: f64,
    pub current_temp: f64,
    pub condition: Condition,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
    pub observed_at: DateTime<FixedOffset>,
}

impl ManualWeather {
    /// Checks `min <= avg <= max` (all finite) and that sunset does not come
    /// before sunrise.
    pub fn validate(&self) -> Result<()> {
        let temps = [self.min_temp, self.avg_temp, self.max_temp, self.current_temp];
        if temps.iter().any(|t| !t.is_finite()) {
            return Err(invalid("temperatures must be finite numbers"));
        }
        if !(self.min_temp <= self.avg_temp && self.avg_temp <= self.max_temp) {
            return Err(invalid(&format!(
                "temperature values do not make sense: min {} / avg {} / max {}",
                self.min_temp, self.avg_temp, self.max_temp
            )));
        }
        if self.sunset < self.sunrise {
            return Err(invalid("sunset must come after sunrise"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> BoktaiError {
    BoktaiError::InvalidManualInput(msg.to_string())
}

// ---------------------------------------------------------------------------
// Raw form entries
// ---------------------------------------------------------------------------

/// Raw manual-weather entries, exactly as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualForm<'a> {
    pub min: &'a str,
    pub avg: &'a str,
    pub max: &'a str,
    /// Scale the three temperatures are typed in.
    pub scale: TempScale,
    /// Condition display name (`"Light Cloud"`) or short code (`"lc"`).
    pub weather: &'a str,
    /// `"HH:MM"` (24-hour) or `"h:MM AM"`.
    pub sunrise: &'a str,
    pub sunset: &'a str,
}

impl ManualForm<'_> {
    /// Parses the three temperatures and returns them in Fahrenheit,
    /// checking `min <= avg <= max`.
    pub fn fahrenheit_range(&self) -> Result<(f64, f64, f64)> {
        if [self.min, self.avg, self.max].iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("all temperature fields must be filled"));
        }
        let parse = |raw: &str| -> Result<f64> {
            let value: f64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("temperature range values must be whole or decimal numbers"))?;
            Ok(match self.scale {
                TempScale::Fahrenheit => value,
                TempScale::Celsius => TempScale::Fahrenheit.from_celsius(value),
            })
        };
        let (min_f, avg_f, max_f) = (parse(self.min)?, parse(self.avg)?, parse(self.max)?);
        if !(min_f <= avg_f && avg_f <= max_f) {
            return Err(invalid(&format!(
                "temperature values do not make sense: min {}°F / avg {}°F / max {}°F",
                min_f, avg_f, max_f
            )));
        }
        Ok((min_f, avg_f, max_f))
    }

    pub fn condition(&self) -> Result<Condition> {
        let raw = self.weather.trim();
        Condition::from_name(raw)
            .or_else(|| raw.parse().ok())
            .ok_or_else(|| invalid(&format!("invalid weather state provided: {:?}", raw)))
    }

    /// Builds manual weather for today (the date of `now`, in `now`'s
    /// offset). The current temperature starts at the average.
    pub fn parse_at(&self, version: GameVersion, now: DateTime<FixedOffset>) -> Result<ManualWeather> {
        let (min_f, avg_f, max_f) = self.fahrenheit_range()?;
        let condition = self.condition()?;
        let sunrise = on_day_of(now, parse_time_of_day(self.sunrise)?)?;
        let sunset = on_day_of(now, parse_time_of_day(self.sunset)?)?;

        let avg_temp = round2(f_to_c(avg_f));
        let weather = ManualWeather {
            state: MANUAL_STATE.to_string(),
            city: manual_city(version).to_string(),
            min_temp: round2(f_to_c(min_f)),
            avg_temp,
            max_temp: round2(f_to_c(max_f)),
            current_temp: avg_temp,
            condition,
            sunrise,
            sunset,
            observed_at: now,
        };
        weather.validate()?;
        Ok(weather)
    }
}

/// Home town of the solar boy in each game, used as the manual city label.
pub fn manual_city(version: GameVersion) -> &'static str {
    match version {
        GameVersion::One => "Istrakan",
        GameVersion::Two | GameVersion::Three => "San Miguel",
    }
}

/// Parses `"HH:MM"`, `"h:MM AM"` or `"h:MMPM"`.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| invalid(&format!("invalid time provided: {:?}", raw)))
}

fn on_day_of(now: DateTime<FixedOffset>, time: NaiveTime) -> Result<DateTime<FixedOffset>> {
    now.date_naive()
        .and_time(time)
        .and_local_timezone(*now.offset())
        .single()
        .ok_or_else(|| invalid("time does not exist on this day"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
