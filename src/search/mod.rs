//! Debounced city search, location selection and forecast loading.

mod controller;
mod request;
mod state;

pub use controller::{ControllerEvent, SearchController, SearchSettings};
pub use request::{cancellable, Debouncer, RequestStatus, RequestTicket, RequestTracker};
pub use state::{ActiveLocation, MapPin, UiState};
