/// Weather condition registry.
///
/// Defines the closed set of weather conditions the simulator understands,
/// each with its characteristic 0–10 gauge range ("how good is this weather
/// for solar charging") and the additive modifier applied to the final
/// blended score. This is the single source of truth for condition codes:
/// all other modules look conditions up from here rather than hardcoding
/// ranges.
///
/// Also maps WMO weather interpretation codes, as reported by Open-Meteo,
/// onto the ten conditions. The two vocabularies do not mesh neatly, so the
/// mapping is a best fit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "sn")]
    Snow,
    #[serde(rename = "sl")]
    Sleet,
    #[serde(rename = "h")]
    Hail,
    #[serde(rename = "t")]
    Thunderstorm,
    #[serde(rename = "hr")]
    HeavyRain,
    #[serde(rename = "lr")]
    LightRain,
    #[serde(rename = "s")]
    Showers,
    #[serde(rename = "hc")]
    HeavyCloud,
    #[serde(rename = "lc")]
    LightCloud,
    #[serde(rename = "c")]
    Clear,
}

impl Condition {
    /// Static gauge data for this condition.
    pub fn class(self) -> &'static WeatherClass {
        // Registry order matches declaration order.
        &WEATHER_CLASSES[self as usize]
    }

    pub fn code(self) -> &'static str {
        self.class().code
    }

    pub fn name(self) -> &'static str {
        self.class().name
    }

    /// Looks a condition up by its display name, e.g. `"Heavy Rain"`.
    pub fn from_name(name: &str) -> Option<Condition> {
        WEATHER_CLASSES.iter().find(|c| c.name == name).map(|c| c.condition)
    }
}

impl FromStr for Condition {
    type Err = String;

    /// Parses a short condition code such as `"lc"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        find_class(s)
            .map(|c| c.condition)
            .ok_or_else(|| format!("unknown weather condition code {:?}", s))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Weather classes
// ---------------------------------------------------------------------------

/// Characteristic gauge range and modifier for one condition.
///
/// `min <= avg <= max` always holds; `avg` is the mode of the triangular
/// draw used for the random weather signal.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherClass {
    pub condition: Condition,
    /// Short code used in records and preferences.
    pub code: &'static str,
    pub name: &'static str,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    /// Added to the blended score before clamping.
    pub modifier: f64,
}

/// All known weather conditions, roughly worst to best for solar charging.
pub static WEATHER_CLASSES: &[WeatherClass] = &[
    WeatherClass { condition: Condition::Snow, code: "sn", name: "Snow", min: 0.0, avg: 2.0, max: 5.0, modifier: 0.0 },
    WeatherClass { condition: Condition::Sleet, code: "sl", name: "Sleet", min: 0.0, avg: 1.0, max: 3.0, modifier: -2.0 },
    WeatherClass { condition: Condition::Hail, code: "h", name: "Hail", min: 0.0, avg: 1.0, max: 3.0, modifier: -2.0 },
    WeatherClass { condition: Condition::Thunderstorm, code: "t", name: "Thunderstorm", min: 0.0, avg: 1.0, max: 2.0, modifier: -2.0 },
    WeatherClass { condition: Condition::HeavyRain, code: "hr", name: "Heavy Rain", min: 0.0, avg: 2.0, max: 4.0, modifier: -1.0 },
    WeatherClass { condition: Condition::LightRain, code: "lr", name: "Light Rain", min: 0.0, avg: 3.0, max: 8.0, modifier: 0.0 },
    WeatherClass { condition: Condition::Showers, code: "s", name: "Showers", min: 1.0, avg: 5.0, max: 9.0, modifier: 1.0 },
    WeatherClass { condition: Condition::HeavyCloud, code: "hc", name: "Heavy Cloud", min: 0.0, avg: 2.0, max: 4.0, modifier: -1.0 },
    WeatherClass { condition: Condition::LightCloud, code: "lc", name: "Light Cloud", min: 2.0, avg: 5.0, max: 10.0, modifier: 1.0 },
    WeatherClass { condition: Condition::Clear, code: "c", name: "Clear", min: 4.0, avg: 7.0, max: 10.0, modifier: 1.0 },
];

/// Looks up a weather class by short code. Returns `None` if not found.
pub fn find_class(code: &str) -> Option<&'static WeatherClass> {
    WEATHER_CLASSES.iter().find(|c| c.code == code)
}

/// Display names of every condition, in registry order. Handy for menus.
pub fn condition_names() -> Vec<&'static str> {
    WEATHER_CLASSES.iter().map(|c| c.name).collect()
}

// ---------------------------------------------------------------------------
// WMO weather interpretation codes
// ---------------------------------------------------------------------------

/// Maps a WMO weather code (Open-Meteo `weather_code`) onto a condition.
///
/// Returns `None` for codes WMO does not define in the Open-Meteo subset.
pub fn from_wmo_code(code: u16) -> Option<Condition> {
    let condition = match code {
        0 => Condition::Clear,                     // clear sky
        1 | 2 => Condition::LightCloud,            // mainly clear, partly cloudy
        3 | 45 | 48 => Condition::HeavyCloud,      // overcast, fog, rime fog
        51 | 53 | 56 => Condition::Showers,        // light/moderate drizzle
        55 | 57 | 61 | 66 => Condition::LightRain, // dense drizzle, slight rain
        63 | 65 | 80 | 81 | 82 => Condition::HeavyRain,
        67 | 86 => Condition::Hail,                // heavy freezing rain, heavy snow showers
        71 | 73 | 75 | 77 => Condition::Snow,
        85 => Condition::Sleet,                    // slight snow showers
        95 | 96 | 99 => Condition::Thunderstorm,
        _ => return None,
    };
    Some(condition)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
