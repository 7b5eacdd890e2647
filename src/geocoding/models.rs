use serde::{Deserialize, Serialize};

// ============================================================================
// Domain types
// ============================================================================

/// A place the geocoder matched for the user's query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: Option<u64>,
    pub name: String,
    pub country: String,
    pub admin_region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Identity of a candidate: the geocoder id when present, else name + coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateIdentity {
    Id(u64),
    Place {
        name: String,
        latitude_bits: u64,
        longitude_bits: u64,
    },
}

impl LocationCandidate {
    pub fn identity(&self) -> CandidateIdentity {
        match self.id {
            Some(id) => CandidateIdentity::Id(id),
            None => CandidateIdentity::Place {
                name: self.name.clone(),
                latitude_bits: self.latitude.to_bits(),
                longitude_bits: self.longitude.to_bits(),
            },
        }
    }

    /// "Paris, Île-de-France, France" style label for the suggestion list
    pub fn display_label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(region) = self.admin_region.as_deref() {
            if !region.is_empty() && region != self.name {
                parts.push(region);
            }
        }
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        parts.join(", ")
    }
}

// ============================================================================
// Open-Meteo Geocoding API Response (Internal)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodingResponse {
    /// Absent entirely when nothing matched
    #[serde(default)]
    pub results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodingResult {
    pub id: Option<u64>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub admin1: Option<String>,
}

impl From<GeocodingResult> for LocationCandidate {
    fn from(r: GeocodingResult) -> Self {
        LocationCandidate {
            id: r.id,
            name: r.name,
            country: r.country.or(r.country_code).unwrap_or_default(),
            admin_region: r.admin1,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}
