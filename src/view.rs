//! Plain-text rendering of the dashboard.
//!
//! Rendering is a pure function of [`UiState`]; the binary prints the result
//! after every state change.

use std::fmt::Write;

use crate::recent::RecentSearchEntry;
use crate::search::UiState;
use crate::weather::display::{
    day_label, format_clock, format_degrees, format_long_date, format_temperature, format_wind,
};
use crate::weather::WeatherSnapshot;

const RULE: &str = "----------------------------------------------------------------";

pub const MAP_PLACEHOLDER: &str = "Search for a location to display the map";

pub fn render(state: &UiState) -> String {
    let mut out = String::new();

    render_header(&mut out, state);
    render_notifications(&mut out, state);
    render_suggestions(&mut out, state);

    match &state.weather {
        Some(snapshot) => {
            render_weather(&mut out, snapshot);
            render_forecast(&mut out, snapshot);
        }
        None if state.is_loading() => {}
        None => out.push_str("No weather loaded yet.\n"),
    }

    render_map(&mut out, state);
    render_footer(&mut out);
    out
}

/// Numbered list of past lookups, most recent first
pub fn render_recent(entries: &[RecentSearchEntry]) -> String {
    if entries.is_empty() {
        return "No recent searches.\n".to_string();
    }

    let mut out = String::from("Recent searches:\n");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} ({:.2}, {:.2})",
            i + 1,
            entry.name,
            entry.latitude,
            entry.longitude
        );
    }
    out
}

fn render_header(out: &mut String, state: &UiState) {
    let theme = if state.dark_mode { "dark" } else { "light" };
    let _ = writeln!(out, "{RULE}");
    let _ = write!(out, "aeris [{}] [{theme}]", state.unit.temperature_symbol());
    if state.is_loading() {
        out.push_str("  loading...");
    }
    out.push('\n');
    let _ = writeln!(out, "Search: {}", state.input);
    let _ = writeln!(out, "{RULE}");
}

fn render_notifications(out: &mut String, state: &UiState) {
    for notification in state.notifications.active() {
        let _ = writeln!(
            out,
            "[{}] {}",
            notification.kind.label(),
            notification.message
        );
    }
}

fn render_suggestions(out: &mut String, state: &UiState) {
    if state.suggestions.is_empty() {
        return;
    }
    out.push_str("Suggestions:\n");
    for (i, candidate) in state.suggestions.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, candidate.display_label());
    }
}

fn render_weather(out: &mut String, snapshot: &WeatherSnapshot) {
    let current = &snapshot.current;
    let glyph = snapshot.glyph();

    let _ = writeln!(out, "{}", snapshot.city_name);
    let _ = writeln!(out, "{}", format_long_date(current.observed_at));
    let _ = writeln!(
        out,
        "{} {}  {}",
        glyph.symbol(),
        glyph.description(),
        format_temperature(current.temperature, snapshot.unit)
    );
    let _ = writeln!(
        out,
        "Feels like {}",
        format_temperature(current.apparent_temperature, snapshot.unit)
    );
    let _ = writeln!(out, "Humidity {}%", current.humidity.round());
    let _ = writeln!(
        out,
        "Wind {}",
        format_wind(current.wind_speed, current.wind_direction_degrees, snapshot.unit)
    );
    let _ = writeln!(out, "Precipitation {:.1} mm", current.precipitation);

    if let Some(today) = snapshot.daily.first() {
        let _ = writeln!(
            out,
            "Sunrise {}  Sunset {}",
            format_clock(today.sunrise),
            format_clock(today.sunset)
        );
    }
}

fn render_forecast(out: &mut String, snapshot: &WeatherSnapshot) {
    if snapshot.daily.is_empty() {
        return;
    }
    let _ = writeln!(out, "{RULE}");
    for (i, day) in snapshot.daily.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<6} {} {:>5} / {:<5}",
            day_label(i, day.date),
            day.glyph().symbol(),
            format_degrees(day.temp_max),
            format_degrees(day.temp_min)
        );
    }
}

fn render_map(out: &mut String, state: &UiState) {
    let _ = writeln!(out, "{RULE}");
    match state.map_pin() {
        Some(pin) => {
            let _ = writeln!(
                out,
                "Map ({:.4}, {:.4}): {}",
                pin.latitude, pin.longitude, pin.label
            );
        }
        None => {
            let _ = writeln!(out, "{MAP_PLACEHOLDER}");
        }
    }
}

fn render_footer(out: &mut String) {
    let _ = writeln!(out, "{RULE}");
    out.push_str("Data by Open-Meteo | :pick N  :go  :unit c|f  :dark  :recent [N]  :dismiss  :quit\n");
}
