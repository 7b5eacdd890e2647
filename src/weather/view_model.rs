use chrono::{NaiveDate, NaiveDateTime};

use super::display::{weather_glyph, WeatherGlyph};
use crate::error::ApiError;
use crate::forecast::{CurrentBlock, DailyBlock, ForecastPayload, Unit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction_degrees: f64,
    pub precipitation: f64,
    pub weather_code: i32,
    /// Local time at the location
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub weather_code: i32,
    pub temp_min: f64,
    pub temp_max: f64,
    pub sunrise: NaiveDateTime,
    pub sunset: NaiveDateTime,
}

impl DailyForecastEntry {
    pub fn glyph(&self) -> WeatherGlyph {
        weather_glyph(self.weather_code)
    }
}

/// Everything the view renders for one location in one unit system.
/// Replaced as a whole on every successful fetch, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current: CurrentConditions,
    /// Chronological, one entry per calendar day, first entry is today
    pub daily: Vec<DailyForecastEntry>,
    pub unit: Unit,
    pub timezone: Option<String>,
}

impl WeatherSnapshot {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn glyph(&self) -> WeatherGlyph {
        weather_glyph(self.current.weather_code)
    }
}

/// Shape a raw forecast payload into a snapshot. Pure and deterministic.
///
/// The snapshot keeps the caller's coordinates (the selected place), not the
/// grid point the API snapped to, so re-fetching the same place under a
/// different unit yields identical coordinates.
pub fn shape(
    payload: &ForecastPayload,
    city_name: &str,
    coordinates: Coordinates,
    unit: Unit,
) -> Result<WeatherSnapshot, ApiError> {
    Ok(WeatherSnapshot {
        city_name: city_name.to_string(),
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        current: shape_current(&payload.current)?,
        daily: shape_daily(&payload.daily)?,
        unit,
        timezone: payload.timezone.clone(),
    })
}

fn shape_current(current: &CurrentBlock) -> Result<CurrentConditions, ApiError> {
    Ok(CurrentConditions {
        temperature: current.temperature_2m,
        apparent_temperature: current.apparent_temperature,
        humidity: current.relative_humidity_2m,
        wind_speed: current.wind_speed_10m,
        wind_direction_degrees: current.wind_direction_10m,
        precipitation: current.precipitation,
        weather_code: current.weather_code,
        observed_at: parse_local_datetime(&current.time)?,
    })
}

fn shape_daily(daily: &DailyBlock) -> Result<Vec<DailyForecastEntry>, ApiError> {
    let days = daily.time.len();
    let lengths = [
        ("weather_code", daily.weather_code.len()),
        ("temperature_2m_max", daily.temperature_2m_max.len()),
        ("temperature_2m_min", daily.temperature_2m_min.len()),
        ("sunrise", daily.sunrise.len()),
        ("sunset", daily.sunset.len()),
    ];
    if let Some((field, len)) = lengths.iter().find(|(_, len)| *len != days) {
        return Err(ApiError::Parse(format!(
            "daily.{field} has {len} entries, expected {days}"
        )));
    }

    let mut entries = Vec::with_capacity(days);
    for i in 0..days {
        let date = NaiveDate::parse_from_str(&daily.time[i], "%Y-%m-%d")
            .map_err(|e| ApiError::Parse(format!("Invalid date {:?}: {e}", daily.time[i])))?;

        entries.push(DailyForecastEntry {
            date,
            weather_code: daily.weather_code[i],
            temp_min: daily.temperature_2m_min[i],
            temp_max: daily.temperature_2m_max[i],
            sunrise: parse_local_datetime(&daily.sunrise[i])?,
            sunset: parse_local_datetime(&daily.sunset[i])?,
        });
    }

    // Chronological, one entry per day; the first occurrence of a date wins
    entries.sort_by_key(|e| e.date);
    entries.dedup_by_key(|e| e.date);

    Ok(entries)
}

/// Parse the API's local ISO 8601 time ("2024-01-15T07:15", seconds optional)
fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| ApiError::Parse(format!("Invalid datetime format: {s}")))
}
