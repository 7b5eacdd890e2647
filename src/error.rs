use serde::Deserialize;
use thiserror::Error;

const GENERIC_FORECAST_FAILURE: &str = "Failed to fetch weather data";

/// Failure of a call to one of the upstream HTTP APIs.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (DNS, connect, reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The caller aborted the request before it resolved
    #[error("Request cancelled")]
    Cancelled,

    /// Non-2xx response
    #[error("HTTP error: status {status}")]
    Http {
        status: u16,
        /// Error text supplied by the API body, if any
        reason: Option<String>,
    },

    /// Malformed or inconsistent response body
    #[error("Invalid API response: {0}")]
    Parse(String),
}

impl ApiError {
    /// True for transport failures, including cancellation.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stable code for programmatic handling and log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
        }
    }

    /// Text shown in the notification surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http {
                reason: Some(reason),
                ..
            } if !reason.trim().is_empty() => reason.clone(),
            _ => GENERIC_FORECAST_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Error body returned by the Open-Meteo APIs
#[derive(Debug, Deserialize)]
struct OpenMeteoErrorBody {
    reason: Option<String>,
}

/// Pass 2xx responses through; turn anything else into `ApiError::Http`.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = response
        .json::<OpenMeteoErrorBody>()
        .await
        .ok()
        .and_then(|body| body.reason);

    Err(ApiError::Http {
        status: status.as_u16(),
        reason,
    })
}

/// Read the body and deserialize it, reporting malformed JSON as `ApiError::Parse`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Failure of the local key-value storage. Never leaves `RecentSearchesStore`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
