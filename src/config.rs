use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::forecast::{Unit, DEFAULT_FORECAST_URL};
use crate::geocoding::DEFAULT_GEOCODING_URL;
use crate::search::SearchSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Open-Meteo geocoding API base URL
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Open-Meteo forecast API base URL
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Language for geocoding results
    #[serde(default = "default_language")]
    pub language: String,

    /// Temperature units: celsius or fahrenheit
    #[serde(default)]
    pub units: Unit,

    #[serde(default)]
    pub dark_mode: bool,

    /// City looked up on start-up; empty disables
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Days in the forecast strip (1-16)
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Where recent searches are persisted. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Shorter (trimmed) inputs never reach the geocoder
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Maximum suggestions shown
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_chars: default_min_query_chars(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_city() -> String {
    "New York".to_string()
}

fn default_forecast_days() -> u8 {
    6
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_chars() -> usize {
    2
}

fn default_suggestion_limit() -> u8 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Start with default values
            .set_default("geocoding_url", default_geocoding_url())?
            .set_default("forecast_url", default_forecast_url())?
            .set_default("language", default_language())?
            .set_default("default_city", default_city())?
            // Load from config file if present
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with AERIS_)
            // Convert SCREAMING_SNAKE_CASE env vars to snake_case config keys
            .add_source(
                Environment::with_prefix("AERIS")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configured data dir, else `<platform data dir>/aeris`, else `./.aeris`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("aeris"))
                .unwrap_or_else(|| PathBuf::from(".aeris"))
        })
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: Duration::from_millis(self.search.debounce_ms),
            min_query_chars: self.search.min_query_chars,
            suggestion_limit: self.search.suggestion_limit,
        }
    }
}
