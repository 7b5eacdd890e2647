pub mod models;
mod service;

pub use models::{CurrentBlock, DailyBlock, ForecastPayload, Unit};
#[cfg(test)]
pub use service::MockForecastClient;
pub use service::{
    ForecastClient, OpenMeteoForecaster, CURRENT_FIELDS, DAILY_FIELDS, DEFAULT_FORECAST_URL,
};
