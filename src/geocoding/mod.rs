pub mod models;
mod service;

pub use models::{CandidateIdentity, LocationCandidate};
#[cfg(test)]
pub use service::MockGeocodingClient;
pub use service::{GeocodingClient, OpenMeteoGeocoder, DEFAULT_GEOCODING_URL};
