use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use std::collections::HashSet;
use tracing::instrument;

use super::models::{GeocodingResponse, LocationCandidate};
use crate::error::{decode_json, error_for_status, ApiError};

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";

/// Resolves free-text place names into ranked candidates.
///
/// Dropping the returned future aborts the underlying request without side
/// effects, which is how callers cancel an in-flight search.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    async fn search(&self, query: &str, limit: u8) -> Result<Vec<LocationCandidate>, ApiError>;
}

/// Open-Meteo geocoding API client (no API key required)
pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
    language: String,
}

impl OpenMeteoGeocoder {
    pub fn new(client: Client, base_url: &str, language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[async_trait]
impl GeocodingClient for OpenMeteoGeocoder {
    #[instrument(skip(self), fields(query = %query, limit = limit))]
    async fn search(&self, query: &str, limit: u8) -> Result<Vec<LocationCandidate>, ApiError> {
        tracing::debug!("Geocoding query");

        let count = limit.to_string();
        let response = self
            .client
            .get(self.search_url())
            .query(&[
                ("name", query),
                ("count", count.as_str()),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let body: GeocodingResponse = decode_json(response).await?;

        // Ranked order is kept; repeats of the same place are dropped
        let mut seen = HashSet::new();
        let candidates: Vec<LocationCandidate> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(LocationCandidate::from)
            .filter(|candidate| seen.insert(candidate.identity()))
            .take(usize::from(limit))
            .collect();

        tracing::debug!(count = candidates.len(), "Geocoding returned candidates");

        Ok(candidates)
    }
}
