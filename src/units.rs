//! Fahrenheit/Celsius conversion and the temperature scale selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub fn f_to_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

pub fn c_to_f(celsius: f64) -> f64 {
    (celsius * 9.0 / 5.0) + 32.0
}

/// Rounds to two decimal places.
///
/// Rounds the exact decimal value of `value`, so `2.675` (stored as
/// 2.67499...) becomes 2.67. Exact ties go to even.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Scale that user-facing temperatures are entered and shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempScale {
    #[default]
    #[serde(rename = "F")]
    Fahrenheit,
    #[serde(rename = "C")]
    Celsius,
}

impl TempScale {
    /// Converts a value expressed in this scale to Celsius.
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TempScale::Fahrenheit => f_to_c(value),
            TempScale::Celsius => value,
        }
    }

    /// Converts a Celsius value into this scale.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TempScale::Fahrenheit => c_to_f(celsius),
            TempScale::Celsius => celsius,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TempScale::Fahrenheit => "°F",
            TempScale::Celsius => "°C",
        }
    }
}

impl FromStr for TempScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "F" => Ok(TempScale::Fahrenheit),
            "C" => Ok(TempScale::Celsius),
            other => Err(format!("temperature scale must be one of (F, C), got {:?}", other)),
        }
    }
}

impl fmt::Display for TempScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempScale::Fahrenheit => write!(f, "F"),
            TempScale::Celsius => write!(f, "C"),
        }
    }
}
