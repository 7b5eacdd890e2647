use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use tracing::instrument;

use super::models::{ForecastPayload, Unit};
use crate::error::{decode_json, error_for_status, ApiError};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1";

/// Current-conditions fields requested from the forecast API
pub const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
precipitation,weather_code,wind_speed_10m,wind_direction_10m";

/// Daily fields requested from the forecast API
pub const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,sunrise,sunset";

const MAX_FORECAST_DAYS: u8 = 16;

/// Fetches current conditions plus a daily forecast for a coordinate pair.
///
/// Cancellation works the same way as for geocoding: drop the future.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ForecastClient: Send + Sync {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        unit: Unit,
    ) -> Result<ForecastPayload, ApiError>;
}

/// Open-Meteo forecast API client
pub struct OpenMeteoForecaster {
    client: Client,
    base_url: String,
    forecast_days: u8,
}

impl OpenMeteoForecaster {
    pub fn new(client: Client, base_url: &str, forecast_days: u8) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            forecast_days: forecast_days.clamp(1, MAX_FORECAST_DAYS),
        }
    }

    fn forecast_url(&self) -> String {
        format!("{}/forecast", self.base_url)
    }

    fn query_params(&self, latitude: f64, longitude: f64, unit: Unit) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("temperature_unit", unit.temperature_param().to_string()),
            ("wind_speed_unit", unit.wind_speed_param().to_string()),
            ("forecast_days", self.forecast_days.to_string()),
        ]
    }
}

#[async_trait]
impl ForecastClient for OpenMeteoForecaster {
    #[instrument(skip(self), fields(lat = %latitude, lon = %longitude, unit = ?unit))]
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        unit: Unit,
    ) -> Result<ForecastPayload, ApiError> {
        tracing::debug!("Fetching forecast");

        let response = self
            .client
            .get(self.forecast_url())
            .query(&self.query_params(latitude, longitude, unit))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "Received forecast API response");

        let response = error_for_status(response).await?;
        let payload: ForecastPayload = decode_json(response).await?;

        tracing::debug!(days = payload.daily.time.len(), "Forecast payload decoded");

        Ok(payload)
    }
}
