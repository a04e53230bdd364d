//! Boktai solar sensor simulator.
//!
//! Turns real (or hand-entered) weather into the solar gauge reading the
//! Boktai games would show: 0–8 segments for Boktai 1, 0–10 for Boktai 2
//! and 3.
//!
//! - `ingest` resolves locations and fetches weather.
//! - `observation` and `cache` hold the weather for a location.
//! - `gauge` blends temperature, weather, sun and random signals into a
//!   reading.
//! - `display`, `config` and `logging` serve the `boktaisim` binary.

pub mod cache;
pub mod conditions;
pub mod config;
pub mod display;
pub mod gauge;
pub mod ingest;
pub mod logging;
pub mod manual;
pub mod model;
pub mod observation;
pub mod scaling;
pub mod sun;
pub mod units;

pub use gauge::GaugeSession;
pub use model::{BoktaiError, GameVersion, Result};
pub use observation::WeatherObservation;
