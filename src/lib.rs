//! Weather dashboard core: debounced city search against the Open-Meteo
//! geocoder, forecast loading, view-model shaping and recent searches.
//!
//! The binary in `main.rs` wires these into a terminal front-end.

pub mod config;
pub mod error;
pub mod forecast;
pub mod geocoding;
pub mod notifications;
pub mod recent;
pub mod search;
pub mod view;
pub mod weather;
