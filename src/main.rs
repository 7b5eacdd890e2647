use anyhow::Context;
use reqwest::Client;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aeris::config::{AppConfig, HttpConfig};
use aeris::forecast::{OpenMeteoForecaster, Unit};
use aeris::geocoding::OpenMeteoGeocoder;
use aeris::recent::{FileStore, RecentSearchesStore};
use aeris::search::{SearchController, UiState};
use aeris::view;

/// Create shared HTTP client with connection pooling.
///
/// No overall request timeout: a slow request stays pending until the user
/// supersedes it.
fn create_http_client(http: &HttpConfig) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(http.connect_timeout())
        .pool_idle_timeout(http.pool_idle_timeout())
        .pool_max_idle_per_host(10)
        .build()
        .context("Failed to create HTTP client")
}

/// A line typed at the prompt
#[derive(Debug, PartialEq)]
enum Command {
    Input(String),
    Pick(usize),
    Submit,
    Unit(Unit),
    ToggleDark,
    Recent(Option<usize>),
    Dismiss(Option<usize>),
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let Some(rest) = line.strip_prefix(':') else {
            return Command::Input(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        // 1-based on screen, 0-based internally
        let index = arg.and_then(|a| a.parse::<usize>().ok()).and_then(|n| n.checked_sub(1));

        match (name, arg) {
            ("pick", Some(_)) => index.map_or_else(|| Command::Unknown(line.to_string()), Command::Pick),
            ("go", None) => Command::Submit,
            ("unit", Some(u)) => {
                Unit::parse(u).map_or_else(|| Command::Unknown(line.to_string()), Command::Unit)
            }
            ("dark", None) => Command::ToggleDark,
            ("recent", None) => Command::Recent(None),
            ("recent", Some(_)) if index.is_some() => Command::Recent(index),
            ("dismiss", None) => Command::Dismiss(None),
            ("dismiss", Some(_)) if index.is_some() => Command::Dismiss(index),
            ("quit" | "q", None) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Apply a command. Returns false when the user asked to quit.
fn apply(controller: &mut SearchController, command: Command) -> bool {
    match command {
        Command::Input(text) => controller.on_input_change(text),
        Command::Pick(index) => {
            if !controller.on_select_suggestion(index) {
                println!("No suggestion #{}", index + 1);
            }
        }
        Command::Submit => controller.on_submit(),
        Command::Unit(unit) => controller.on_unit_change(unit),
        Command::ToggleDark => controller.toggle_dark_mode(),
        Command::Recent(None) => print!("{}", view::render_recent(controller.recent_searches())),
        Command::Recent(Some(index)) => {
            if !controller.on_select_recent(index) {
                println!("No recent search #{}", index + 1);
            }
        }
        Command::Dismiss(None) => controller.dismiss_all_notifications(),
        Command::Dismiss(Some(index)) => {
            let id = controller.state().notifications.active().nth(index).map(|n| n.id);
            match id {
                Some(id) => {
                    controller.dismiss_notification(id);
                }
                None => println!("No notification #{}", index + 1),
            }
        }
        Command::Quit => return false,
        Command::Unknown(line) => println!("Unknown command: {line}"),
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; logs go to stderr so they never interleave with the dashboard
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aeris=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded successfully");

    // Create shared HTTP client with connection pooling
    let http_client = create_http_client(&config.http)?;
    tracing::debug!("Shared HTTP client created");

    let geocoder = Arc::new(OpenMeteoGeocoder::new(
        http_client.clone(),
        &config.geocoding_url,
        &config.language,
    ));
    let forecaster = Arc::new(OpenMeteoForecaster::new(
        http_client,
        &config.forecast_url,
        config.forecast_days,
    ));

    let data_dir = config.data_dir();
    tracing::info!(path = %data_dir.display(), "Using data directory");
    let recent = RecentSearchesStore::load(Arc::new(FileStore::new(data_dir))).await;

    let mut controller = SearchController::new(
        geocoder,
        forecaster,
        recent,
        config.search_settings(),
        UiState::new(config.units, config.dark_mode),
    );

    if !config.default_city.trim().is_empty() {
        tracing::info!(city = %config.default_city, "Loading default city");
        controller.bootstrap(&config.default_city);
    }

    print!("{}", view::render(controller.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    tracing::info!("Input closed");
                    break;
                };
                if !apply(&mut controller, Command::parse(line.trim_end())) {
                    break;
                }
            }
            Some(event) = controller.next_event() => {
                controller.handle_event(event).await;
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }

        print!("{}", view::render(controller.state()));
    }

    tracing::info!("Shutdown complete");

    Ok(())
}
