/// Text rendering of the solar gauge.
///
/// ```text
/// Peoria, Illinois
/// Light Cloud, sun Rising
/// Low 64.6°F   Now 81.3°F   High 85.6°F
/// Boktai 2 Gauge [▓▓▓▓▓▓░░░░] 6/10
/// ```

use crate::gauge::GaugeRead;
use crate::model::GameVersion;
use crate::observation::WeatherObservation;
use crate::units::{TempScale, round2};

const FILLED: char = '▓';
const EMPTY: char = '░';

/// `value` filled segments out of `capacity`. Values above capacity fill
/// the bar.
pub fn gauge_bar(value: u8, capacity: u8) -> String {
    let filled = value.min(capacity) as usize;
    let mut bar = String::with_capacity(capacity as usize * 3 + 2);
    bar.push('[');
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, capacity as usize - filled));
    bar.push(']');
    bar
}

fn temp(celsius: f64, scale: TempScale) -> String {
    format!("{}{}", round2(scale.from_celsius(celsius)), scale.symbol())
}

/// Renders the four-line panel for one gauge read.
///
/// `current_temp_c` is passed in rather than read from the observation,
/// since manual observations draw a new current temperature on every read.
pub fn render_panel(
    observation: &WeatherObservation,
    read: &GaugeRead,
    version: GameVersion,
    current_temp_c: f64,
    scale: TempScale,
) -> String {
    let sky = if read.position.is_night() {
        "night".to_string()
    } else {
        format!("sun {}", read.position.phase())
    };
    format!(
        "{}, {}\n{}, {}\nLow {}   Now {}   High {}\n{} Gauge {} {}/{}\n",
        observation.city,
        observation.state,
        observation.condition(),
        sky,
        temp(observation.min_temp(), scale),
        temp(current_temp_c, scale),
        temp(observation.max_temp(), scale),
        version,
        gauge_bar(read.value, version.capacity()),
        read.value,
        version.capacity(),
    )
}
