use serde::{Deserialize, Serialize};

/// Unit system for a forecast request and everything displayed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Unit {
    /// Value for the `temperature_unit` query parameter
    pub fn temperature_param(self) -> &'static str {
        match self {
            Unit::Celsius => "celsius",
            Unit::Fahrenheit => "fahrenheit",
        }
    }

    /// Value for the `wind_speed_unit` query parameter
    pub fn wind_speed_param(self) -> &'static str {
        match self {
            Unit::Celsius => "kmh",
            Unit::Fahrenheit => "mph",
        }
    }

    pub fn temperature_symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
        }
    }

    pub fn wind_speed_label(self) -> &'static str {
        match self {
            Unit::Celsius => "km/h",
            Unit::Fahrenheit => "mph",
        }
    }

    /// Parse user input such as "c", "F", "celsius"
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" | "metric" => Some(Unit::Celsius),
            "f" | "fahrenheit" | "imperial" => Some(Unit::Fahrenheit),
            _ => None,
        }
    }
}

// ============================================================================
// Open-Meteo Forecast API Response
// Field names mirror the API; shaping into display types happens in
// `weather::view_model`.
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    pub current: CurrentBlock,
    pub daily: DailyBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentBlock {
    /// Local time, e.g. "2024-01-15T12:00"
    pub time: String,
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub weather_code: i32,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
}

/// Parallel arrays, one element per day
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBlock {
    pub time: Vec<String>,
    pub weather_code: Vec<i32>,
    pub temperature_2m_max: Vec<f64>,
    pub temperature_2m_min: Vec<f64>,
    pub sunrise: Vec<String>,
    pub sunset: Vec<String>,
}
