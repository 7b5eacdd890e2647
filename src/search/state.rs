use super::request::RequestStatus;
use crate::forecast::Unit;
use crate::geocoding::LocationCandidate;
use crate::notifications::NotificationCenter;
use crate::recent::RecentSearchEntry;
use crate::weather::display::format_degrees;
use crate::weather::{Coordinates, WeatherSnapshot};

/// The place the user last selected; re-used when the unit changes
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ActiveLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl From<&LocationCandidate> for ActiveLocation {
    fn from(candidate: &LocationCandidate) -> Self {
        Self {
            name: candidate.name.clone(),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
        }
    }
}

impl From<&WeatherSnapshot> for ActiveLocation {
    fn from(snapshot: &WeatherSnapshot) -> Self {
        Self {
            name: snapshot.city_name.clone(),
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
        }
    }
}

impl From<&RecentSearchEntry> for ActiveLocation {
    fn from(entry: &RecentSearchEntry) -> Self {
        Self {
            name: entry.name.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
        }
    }
}

impl From<&ActiveLocation> for RecentSearchEntry {
    fn from(location: &ActiveLocation) -> Self {
        Self {
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

/// What the map widget needs to place a pin with a popup
#[derive(Debug, Clone, PartialEq)]
pub struct MapPin {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub dark_mode: bool,
}

/// Single UI state structure consumed by the view layer.
///
/// Only `SearchController` mutates it; everything else reads.
#[derive(Debug, Default)]
pub struct UiState {
    /// Text shown in the search box
    pub input: String,
    pub suggestions: Vec<LocationCandidate>,
    /// Last successfully fetched snapshot; survives failed refreshes
    pub weather: Option<WeatherSnapshot>,
    pub unit: Unit,
    pub dark_mode: bool,
    pub location: Option<ActiveLocation>,
    pub notifications: NotificationCenter,
    pub suggestion_status: RequestStatus,
    pub forecast_status: RequestStatus,
}

impl UiState {
    pub fn new(unit: Unit, dark_mode: bool) -> Self {
        Self {
            unit,
            dark_mode,
            ..Self::default()
        }
    }

    /// A forecast request is outstanding
    pub fn is_loading(&self) -> bool {
        self.forecast_status == RequestStatus::Pending
    }

    pub fn map_pin(&self) -> Option<MapPin> {
        self.weather.as_ref().map(|snapshot| MapPin {
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
            label: format!(
                "{}: {}",
                snapshot.city_name,
                format_degrees(snapshot.current.temperature)
            ),
            dark_mode: self.dark_mode,
        })
    }
}
