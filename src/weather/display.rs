//! Pure display helpers. Stored values keep full precision; rounding happens
//! only here.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

use crate::forecast::Unit;

/// Pictographic category for a numeric weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherGlyph {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Fog,
    Thunderstorm,
    Generic,
}

impl WeatherGlyph {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁️",
            Self::Rain => "🌧️",
            Self::Snow => "❄️",
            Self::Fog => "🌫️",
            Self::Thunderstorm => "⛈️",
            Self::Generic => "🌡️",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Fog => "Fog",
            Self::Thunderstorm => "Thunderstorm",
            Self::Generic => "Unknown",
        }
    }
}

/// Map a weather code to its glyph. Buckets are checked in ascending order,
/// first match wins.
pub fn weather_glyph(code: i32) -> WeatherGlyph {
    match code {
        0..=3 => WeatherGlyph::Clear,
        4..=9 => WeatherGlyph::PartlyCloudy,
        10..=19 => WeatherGlyph::Cloudy,
        20..=29 => WeatherGlyph::Rain,
        30..=39 => WeatherGlyph::Snow,
        40..=49 => WeatherGlyph::Fog,
        50..=69 => WeatherGlyph::Rain,
        70..=79 => WeatherGlyph::Snow,
        80..=99 => WeatherGlyph::Thunderstorm,
        _ => WeatherGlyph::Generic,
    }
}

/// 8-point compass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const COMPASS: [CompassPoint; 8] = [
    CompassPoint::N,
    CompassPoint::NE,
    CompassPoint::E,
    CompassPoint::SE,
    CompassPoint::S,
    CompassPoint::SW,
    CompassPoint::W,
    CompassPoint::NW,
];

impl CompassPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NE => "NE",
            Self::E => "E",
            Self::SE => "SE",
            Self::S => "S",
            Self::SW => "SW",
            Self::W => "W",
            Self::NW => "NW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `round(degrees / 45) mod 8`, indexing the compass from N.
pub fn wind_compass_label(degrees: f64) -> CompassPoint {
    let index = (degrees / 45.0).round() as i64;
    COMPASS[index.rem_euclid(8) as usize]
}

/// Nearest integer, halves rounded up.
pub fn display_round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn format_temperature(value: f64, unit: Unit) -> String {
    format!("{}{}", display_round(value), unit.temperature_symbol())
}

/// Degrees only, as used in compact places like the forecast strip and map popup
pub fn format_degrees(value: f64) -> String {
    format!("{}°", display_round(value))
}

pub fn format_wind(speed: f64, direction_degrees: f64, unit: Unit) -> String {
    format!(
        "{} {} {}",
        display_round(speed),
        unit.wind_speed_label(),
        wind_compass_label(direction_degrees)
    )
}

/// "Today" for the first daily entry, short weekday afterwards
pub fn day_label(index: usize, date: NaiveDate) -> String {
    if index == 0 {
        "Today".to_string()
    } else {
        date.format("%a").to_string()
    }
}

/// "Monday, Jan 15"
pub fn format_long_date(moment: NaiveDateTime) -> String {
    moment.format("%A, %b %-d").to_string()
}

pub fn format_clock(moment: NaiveDateTime) -> String {
    moment.format("%H:%M").to_string()
}
