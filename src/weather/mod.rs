pub mod display;
mod view_model;

pub use display::{wind_compass_label, weather_glyph, CompassPoint, WeatherGlyph};
pub use view_model::{shape, Coordinates, CurrentConditions, DailyForecastEntry, WeatherSnapshot};
