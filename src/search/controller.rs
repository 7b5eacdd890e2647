use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::request::{cancellable, Debouncer, RequestTracker};
use super::state::{ActiveLocation, UiState};
use crate::error::ApiError;
use crate::forecast::{ForecastClient, ForecastPayload, Unit};
use crate::geocoding::{GeocodingClient, LocationCandidate};
use crate::notifications::Notification;
use crate::recent::{RecentSearchEntry, RecentSearchesStore};
use crate::weather::shape;

/// Tunables for the search pipeline
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Quiet period after the last keystroke before geocoding
    pub debounce: Duration,
    /// Trimmed inputs shorter than this never reach the geocoder
    pub min_query_chars: usize,
    pub suggestion_limit: u8,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_chars: 2,
            suggestion_limit: 5,
        }
    }
}

/// Completions posted back to the controller by timers and request tasks
#[derive(Debug)]
pub enum ControllerEvent {
    DebounceElapsed {
        generation: u64,
    },
    SuggestionsFinished {
        generation: u64,
        outcome: Result<Vec<LocationCandidate>, ApiError>,
    },
    ForecastFinished {
        generation: u64,
        location: ActiveLocation,
        unit: Unit,
        outcome: Result<ForecastPayload, ApiError>,
    },
}

/// Transient per-session bookkeeping
struct SearchSession {
    debounce: Debouncer,
    suggestions: RequestTracker,
    forecast: RequestTracker,
    /// Submit the first suggestion as soon as the pending lookup resolves
    auto_submit: bool,
}

/// Owns the UI state and turns user actions into at most one outstanding
/// geocoding request and at most one outstanding forecast request.
///
/// User actions are synchronous and return immediately; network work runs
/// on spawned tasks whose results come back as [`ControllerEvent`]s. The
/// owner drives the loop with [`next_event`](Self::next_event) and
/// [`handle_event`](Self::handle_event), so every state mutation happens on
/// the caller's task.
pub struct SearchController {
    geocoder: Arc<dyn GeocodingClient>,
    forecaster: Arc<dyn ForecastClient>,
    recent: RecentSearchesStore,
    settings: SearchSettings,
    state: UiState,
    session: SearchSession,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl SearchController {
    pub fn new(
        geocoder: Arc<dyn GeocodingClient>,
        forecaster: Arc<dyn ForecastClient>,
        recent: RecentSearchesStore,
        settings: SearchSettings,
        state: UiState,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = SearchSession {
            debounce: Debouncer::new(settings.debounce),
            suggestions: RequestTracker::new(),
            forecast: RequestTracker::new(),
            auto_submit: false,
        };

        Self {
            geocoder,
            forecaster,
            recent,
            settings,
            state,
            session,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn recent_searches(&self) -> &[RecentSearchEntry] {
        self.recent.list()
    }

    /// No timer armed and no request outstanding
    pub fn is_idle(&self) -> bool {
        !self.session.debounce.is_pending()
            && !self.session.suggestions.is_pending()
            && !self.session.forecast.is_pending()
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Store the text right away and (re)arm the suggestion lookup.
    pub fn on_input_change(&mut self, text: impl Into<String>) {
        self.session.auto_submit = false;
        self.session.debounce.cancel();
        if self.session.suggestions.cancel() {
            tracing::debug!("Cancelled in-flight suggestion request");
        }

        self.state.input = text.into();

        if self.state.input.trim().chars().count() < self.settings.min_query_chars {
            self.state.suggestions.clear();
            self.sync_status();
            return;
        }

        let tx = self.events_tx.clone();
        self.session.debounce.schedule(move |generation| {
            let _ = tx.send(ControllerEvent::DebounceElapsed { generation });
        });
        self.sync_status();
    }

    pub fn on_select_candidate(&mut self, candidate: LocationCandidate) {
        tracing::info!(
            city = %candidate.name,
            country = %candidate.country,
            "Location selected"
        );
        self.select_location(ActiveLocation::from(&candidate));
    }

    /// Select the suggestion at `index`; false if there is none
    pub fn on_select_suggestion(&mut self, index: usize) -> bool {
        match self.state.suggestions.get(index).cloned() {
            Some(candidate) => {
                self.on_select_candidate(candidate);
                true
            }
            None => false,
        }
    }

    /// Re-open a previous lookup from the recent-searches list
    pub fn on_select_recent(&mut self, index: usize) -> bool {
        let Some(location) = self.recent.list().get(index).map(ActiveLocation::from) else {
            return false;
        };
        tracing::info!(city = %location.name, "Recent search selected");
        self.select_location(location);
        true
    }

    /// Take the first suggestion, if any. Free text is never sent to the
    /// forecast API directly.
    pub fn on_submit(&mut self) {
        match self.state.suggestions.first().cloned() {
            Some(first) => self.on_select_candidate(first),
            None => tracing::debug!(input = %self.state.input, "Submit with no suggestions ignored"),
        }
    }

    /// Switch units and refetch the active location. Asking again for the
    /// selected unit retries when the displayed snapshot is still in another
    /// unit (the previous refetch failed).
    pub fn on_unit_change(&mut self, unit: Unit) {
        let displayed = self.state.weather.as_ref().map(|w| w.unit);
        if unit == self.state.unit && displayed.map_or(true, |shown| shown == unit) {
            return;
        }
        self.state.unit = unit;
        tracing::info!(unit = ?unit, "Unit changed");

        if let Some(location) = self.state.location.clone() {
            self.start_forecast(location);
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.state.dark_mode = !self.state.dark_mode;
    }

    pub fn dismiss_notification(&mut self, id: Uuid) -> bool {
        self.state.notifications.dismiss(id)
    }

    pub fn dismiss_all_notifications(&mut self) {
        self.state.notifications.dismiss_all();
    }

    /// Look `city` up through the normal suggestion path and load the first
    /// match. Any user input before the lookup resolves takes precedence.
    pub fn bootstrap(&mut self, city: &str) {
        if city.trim().is_empty() {
            return;
        }
        self.on_input_change(city);
        self.session.auto_submit = self.session.debounce.is_pending();
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Wait for the next completion. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.events_rx.recv().await
    }

    pub async fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::DebounceElapsed { generation } => self.on_debounce_elapsed(generation),
            ControllerEvent::SuggestionsFinished {
                generation,
                outcome,
            } => self.on_suggestions_finished(generation, outcome),
            ControllerEvent::ForecastFinished {
                generation,
                location,
                unit,
                outcome,
            } => {
                self.on_forecast_finished(generation, location, unit, outcome)
                    .await
            }
        }
        self.sync_status();
    }

    /// Handle exactly one event
    pub async fn process_next(&mut self) {
        if let Some(event) = self.next_event().await {
            self.handle_event(event).await;
        }
    }

    /// Process events until nothing is pending. A hung request keeps this
    /// waiting until something supersedes it.
    pub async fn settle(&mut self) {
        while !self.is_idle() {
            self.process_next().await;
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn select_location(&mut self, location: ActiveLocation) {
        self.session.auto_submit = false;
        self.session.debounce.cancel();
        if self.session.suggestions.cancel() {
            tracing::debug!("Cancelled in-flight suggestion request");
        }

        self.state.input = location.name.clone();
        self.state.suggestions.clear();
        self.start_forecast(location);
    }

    fn start_forecast(&mut self, location: ActiveLocation) {
        if self.session.forecast.is_pending() {
            tracing::debug!("Superseding in-flight forecast request");
        }
        let ticket = self.session.forecast.begin();
        let unit = self.state.unit;
        self.state.location = Some(location.clone());

        tracing::info!(
            city = %location.name,
            lat = %location.latitude,
            lon = %location.longitude,
            unit = ?unit,
            generation = ticket.generation,
            "Requesting forecast"
        );

        let forecaster = Arc::clone(&self.forecaster);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = cancellable(
                ticket.token,
                forecaster.fetch(location.latitude, location.longitude, unit),
            )
            .await;
            let _ = tx.send(ControllerEvent::ForecastFinished {
                generation: ticket.generation,
                location,
                unit,
                outcome,
            });
        });

        self.sync_status();
    }

    fn on_debounce_elapsed(&mut self, generation: u64) {
        if !self.session.debounce.fire(generation) {
            tracing::debug!(generation, "Ignoring superseded debounce timer");
            return;
        }

        let query = self.state.input.trim().to_string();
        let limit = self.settings.suggestion_limit;
        let ticket = self.session.suggestions.begin();

        tracing::debug!(query = %query, generation = ticket.generation, "Requesting suggestions");

        let geocoder = Arc::clone(&self.geocoder);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = cancellable(ticket.token, geocoder.search(&query, limit)).await;
            let _ = tx.send(ControllerEvent::SuggestionsFinished {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn on_suggestions_finished(
        &mut self,
        generation: u64,
        outcome: Result<Vec<LocationCandidate>, ApiError>,
    ) {
        if !self.session.suggestions.is_current(generation) {
            tracing::debug!(generation, "Discarding stale suggestion result");
            return;
        }

        match outcome {
            Ok(candidates) => {
                self.session.suggestions.resolve(generation);
                tracing::debug!(count = candidates.len(), "Suggestions updated");
                self.state.suggestions = candidates;

                if std::mem::take(&mut self.session.auto_submit) {
                    self.on_submit();
                }
            }
            Err(e) => {
                // Autocomplete is best effort: log, clear, never notify
                self.session.suggestions.fail(generation);
                self.session.auto_submit = false;
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, code = e.error_code(), "Suggestion lookup failed");
                }
                self.state.suggestions.clear();
            }
        }
    }

    async fn on_forecast_finished(
        &mut self,
        generation: u64,
        location: ActiveLocation,
        unit: Unit,
        outcome: Result<ForecastPayload, ApiError>,
    ) {
        if !self.session.forecast.is_current(generation) {
            tracing::debug!(generation, city = %location.name, "Discarding stale forecast result");
            return;
        }

        let shaped = outcome
            .and_then(|payload| shape(&payload, &location.name, location.coordinates(), unit));

        match shaped {
            Ok(snapshot) => {
                self.session.forecast.resolve(generation);
                tracing::info!(
                    city = %snapshot.city_name,
                    temp = %snapshot.current.temperature,
                    days = snapshot.daily.len(),
                    "Forecast fetched successfully"
                );
                self.state.weather = Some(snapshot);
                self.recent.record(RecentSearchEntry::from(&location)).await;
            }
            Err(e) => {
                self.session.forecast.fail(generation);
                // Unit changes keep targeting whatever is still on screen
                self.state.location = self.state.weather.as_ref().map(ActiveLocation::from);

                if e.is_cancelled() {
                    tracing::debug!(city = %location.name, "Forecast request cancelled");
                } else {
                    tracing::error!(
                        error = %e,
                        code = e.error_code(),
                        city = %location.name,
                        "Forecast request failed"
                    );
                    self.state
                        .notifications
                        .push(Notification::error(e.user_message()));
                }
            }
        }
    }

    fn sync_status(&mut self) {
        self.state.suggestion_status = self.session.suggestions.status();
        self.state.forecast_status = self.session.forecast.status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{CurrentBlock, DailyBlock, MockForecastClient};
    use crate::geocoding::MockGeocodingClient;
    use crate::notifications::NotificationKind;
    use crate::recent::MemoryStore;
    use crate::search::RequestStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn candidate(name: &str, country: &str, latitude: f64, longitude: f64) -> LocationCandidate {
        LocationCandidate {
            id: None,
            name: name.to_string(),
            country: country.to_string(),
            admin_region: None,
            latitude,
            longitude,
        }
    }

    fn paris() -> LocationCandidate {
        candidate("Paris", "FR", 48.85, 2.35)
    }

    fn tokyo() -> LocationCandidate {
        candidate("Tokyo", "JP", 35.68, 139.69)
    }

    fn new_york() -> LocationCandidate {
        candidate("New York", "US", 40.7, -74.0)
    }

    fn payload(temperature: f64) -> ForecastPayload {
        ForecastPayload {
            latitude: 0.0,
            longitude: 0.0,
            timezone: None,
            current: CurrentBlock {
                time: "2024-01-15T12:00".to_string(),
                temperature_2m: temperature,
                relative_humidity_2m: 60.0,
                apparent_temperature: temperature - 2.0,
                precipitation: 0.0,
                weather_code: 1,
                wind_speed_10m: 10.0,
                wind_direction_10m: 90.0,
            },
            daily: DailyBlock {
                time: vec!["2024-01-15".into(), "2024-01-16".into()],
                weather_code: vec![1, 61],
                temperature_2m_max: vec![temperature + 3.0, temperature + 1.0],
                temperature_2m_min: vec![temperature - 4.0, temperature - 5.0],
                sunrise: vec!["2024-01-15T07:15".into(), "2024-01-16T07:14".into()],
                sunset: vec!["2024-01-15T16:30".into(), "2024-01-16T16:32".into()],
            },
        }
    }

    /// Returns fixed candidates and records every query
    #[derive(Default)]
    struct FakeGeocoder {
        results: Vec<LocationCandidate>,
        hang: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGeocoder {
        fn returning(results: Vec<LocationCandidate>) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }

        fn hanging() -> Self {
            Self {
                hang: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeocodingClient for FakeGeocoder {
        async fn search(&self, query: &str, limit: u8) -> Result<Vec<LocationCandidate>, ApiError> {
            self.calls.lock().unwrap().push(query.to_string());
            if self.hang {
                std::future::pending::<()>().await;
            }
            Ok(self.results.iter().take(usize::from(limit)).cloned().collect())
        }
    }

    type Gate = oneshot::Receiver<Result<ForecastPayload, ApiError>>;

    /// A fetch for a gated (latitude, unit) waits until the test releases it;
    /// anything else answers immediately (20° in Celsius, 68° in Fahrenheit).
    /// A superseded task can be cancelled before it calls `fetch`, so gates
    /// are keyed, not queued.
    #[derive(Default)]
    struct GatedForecaster {
        gates: Mutex<Vec<(f64, Unit, Gate)>>,
        calls: Mutex<Vec<(f64, f64, Unit)>>,
    }

    impl GatedForecaster {
        fn gate(
            &self,
            latitude: f64,
            unit: Unit,
        ) -> oneshot::Sender<Result<ForecastPayload, ApiError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push((latitude, unit, rx));
            tx
        }

        fn take_gate(&self, latitude: f64, unit: Unit) -> Option<Gate> {
            let mut gates = self.gates.lock().unwrap();
            let position = gates
                .iter()
                .position(|(lat, u, _)| *lat == latitude && *u == unit)?;
            Some(gates.remove(position).2)
        }

        fn calls(&self) -> Vec<(f64, f64, Unit)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ForecastClient for GatedForecaster {
        async fn fetch(
            &self,
            latitude: f64,
            longitude: f64,
            unit: Unit,
        ) -> Result<ForecastPayload, ApiError> {
            self.calls.lock().unwrap().push((latitude, longitude, unit));
            match self.take_gate(latitude, unit) {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Network("gate dropped".to_string()))),
                None => Ok(payload(match unit {
                    Unit::Celsius => 20.0,
                    Unit::Fahrenheit => 68.0,
                })),
            }
        }
    }

    async fn controller_with(
        geocoder: Arc<dyn GeocodingClient>,
        forecaster: Arc<dyn ForecastClient>,
    ) -> SearchController {
        let recent = RecentSearchesStore::load(Arc::new(MemoryStore::new())).await;
        SearchController::new(
            geocoder,
            forecaster,
            recent,
            SearchSettings::default(),
            UiState::default(),
        )
    }

    // ------------------------------------------------------------------
    // Suggestion path
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_short_input_never_geocodes() {
        let mut geocoder = MockGeocodingClient::new();
        geocoder.expect_search().times(0);
        let mut controller =
            controller_with(Arc::new(geocoder), Arc::new(GatedForecaster::default())).await;

        for text in ["", "P", " a ", "\t\n"] {
            controller.on_input_change(text);
            assert!(controller.is_idle());
            assert!(controller.state().suggestions.is_empty());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.state().input, "\t\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_clears_existing_suggestions() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![paris()]));
        let mut controller =
            controller_with(geocoder.clone(), Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("Par");
        controller.settle().await;
        assert_eq!(controller.state().suggestions.len(), 1);

        controller.on_input_change("P");
        assert!(controller.state().suggestions.is_empty());
        assert_eq!(geocoder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_issues_single_request_with_last_text() {
        let mut geocoder = MockGeocodingClient::new();
        geocoder
            .expect_search()
            .withf(|query, limit| query == "Par" && *limit == 5)
            .times(1)
            .returning(|_, _| Ok(vec![paris()]));
        let mut controller =
            controller_with(Arc::new(geocoder), Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("P");
        tokio::time::advance(Duration::from_millis(100)).await;
        controller.on_input_change("Pa");
        tokio::time::advance(Duration::from_millis(250)).await;
        controller.on_input_change("Par");
        controller.settle().await;

        assert_eq!(controller.state().suggestions, vec![paris()]);
        assert_eq!(controller.state().suggestion_status, RequestStatus::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_waits_for_quiet_period() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![paris()]));
        let mut controller =
            controller_with(geocoder.clone(), Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("  Par ");
        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(geocoder.calls().is_empty());
        assert_eq!(controller.state().input, "  Par ");

        controller.settle().await;
        assert_eq!(geocoder.calls(), vec!["Par".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_failure_is_silent() {
        let mut geocoder = MockGeocodingClient::new();
        geocoder.expect_search().times(1).returning(|_, _| {
            Err(ApiError::Http {
                status: 500,
                reason: None,
            })
        });
        let mut controller =
            controller_with(Arc::new(geocoder), Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("Par");
        controller.settle().await;

        assert!(controller.state().suggestions.is_empty());
        assert!(controller.state().notifications.is_empty());
        assert_eq!(controller.state().suggestion_status, RequestStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_keystroke_cancels_inflight_suggestion() {
        let geocoder = Arc::new(FakeGeocoder::hanging());
        let mut controller =
            controller_with(geocoder.clone(), Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("Par");
        controller.process_next().await; // debounce fires, lookup starts
        assert_eq!(controller.state().suggestion_status, RequestStatus::Pending);

        controller.on_input_change("P");
        assert_eq!(controller.state().suggestion_status, RequestStatus::Cancelled);
        assert!(controller.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_suggestions_are_discarded() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![paris()]));
        let mut controller =
            controller_with(geocoder, Arc::new(GatedForecaster::default())).await;

        controller.on_input_change("Par");
        controller.settle().await;

        controller
            .handle_event(ControllerEvent::SuggestionsFinished {
                generation: 0,
                outcome: Ok(vec![tokyo()]),
            })
            .await;
        assert_eq!(controller.state().suggestions, vec![paris()]);
    }

    // ------------------------------------------------------------------
    // Forecast path
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_search_select_fetch_record() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![
            paris(),
            candidate("Paris", "US", 33.66, -95.55),
        ]));
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller = controller_with(geocoder, forecaster.clone()).await;

        controller.on_input_change("Par");
        controller.settle().await;
        assert_eq!(controller.state().suggestions.len(), 2);

        assert!(controller.on_select_suggestion(0));
        assert_eq!(controller.state().input, "Paris");
        assert!(controller.state().suggestions.is_empty());
        assert!(controller.state().is_loading());

        controller.settle().await;

        assert_eq!(forecaster.calls(), vec![(48.85, 2.35, Unit::Celsius)]);
        let snapshot = controller.state().weather.as_ref().expect("snapshot");
        assert_eq!(snapshot.city_name, "Paris");
        assert_eq!(
            controller.recent_searches()[0],
            RecentSearchEntry {
                name: "Paris".to_string(),
                latitude: 48.85,
                longitude: 2.35,
            }
        );
        assert!(!controller.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_uses_first_suggestion() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![tokyo(), paris()]));
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller = controller_with(geocoder, forecaster.clone()).await;

        controller.on_input_change("To");
        controller.settle().await;
        controller.on_submit();
        controller.settle().await;

        assert_eq!(forecaster.calls(), vec![(35.68, 139.69, Unit::Celsius)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_suggestions_is_noop() {
        let mut forecaster = MockForecastClient::new();
        forecaster.expect_fetch().times(0);
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), Arc::new(forecaster)).await;

        controller.on_input_change("Atlantis");
        controller.on_submit();
        assert!(controller.state().location.is_none());
        assert!(!controller.state().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_cancels_pending_suggestion_and_forecast() {
        let geocoder = Arc::new(FakeGeocoder::hanging());
        let forecaster = Arc::new(GatedForecaster::default());
        let _tokyo_gate = forecaster.gate(35.68, Unit::Celsius);
        let mut controller = controller_with(geocoder, forecaster.clone()).await;

        controller.on_select_candidate(tokyo());
        controller.on_input_change("Par");
        controller.process_next().await; // debounce fires, lookup hangs
        assert_eq!(controller.state().suggestion_status, RequestStatus::Pending);
        assert_eq!(controller.state().forecast_status, RequestStatus::Pending);

        controller.on_select_candidate(paris());
        assert_eq!(controller.state().suggestion_status, RequestStatus::Cancelled);
        assert_eq!(controller.state().forecast_status, RequestStatus::Pending);

        controller.settle().await;
        assert_eq!(
            controller.state().weather.as_ref().map(|w| w.city_name.as_str()),
            Some("Paris")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_forecast_never_applies() {
        let forecaster = Arc::new(GatedForecaster::default());
        let tokyo_gate = forecaster.gate(35.68, Unit::Celsius);
        let paris_gate = forecaster.gate(48.85, Unit::Celsius);
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(tokyo());
        controller.on_select_candidate(paris());

        paris_gate.send(Ok(payload(11.0))).expect("paris gate open");
        controller.settle().await;

        // Tokyo arrives last; its task was cancelled, so the gate may be closed
        let _ = tokyo_gate.send(Ok(payload(30.0)));
        // A late resolution carrying the old generation is ignored as well
        controller
            .handle_event(ControllerEvent::ForecastFinished {
                generation: 1,
                location: ActiveLocation::from(&tokyo()),
                unit: Unit::Celsius,
                outcome: Ok(payload(30.0)),
            })
            .await;

        let snapshot = controller.state().weather.as_ref().expect("snapshot");
        assert_eq!(snapshot.city_name, "Paris");
        assert_eq!(snapshot.current.temperature, 11.0);
        assert_eq!(controller.recent_searches().len(), 1);
        assert_eq!(controller.state().location.as_ref().map(|l| l.name.as_str()), Some("Paris"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forecast_failure_keeps_previous_snapshot() {
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(tokyo());
        controller.settle().await;
        let before = controller.state().weather.clone().expect("tokyo snapshot");

        let paris_gate = forecaster.gate(48.85, Unit::Celsius);
        controller.on_select_candidate(paris());
        paris_gate
            .send(Err(ApiError::Http {
                status: 500,
                reason: None,
            }))
            .expect("gate open");
        controller.settle().await;

        assert_eq!(controller.state().weather.as_ref(), Some(&before));
        assert_eq!(controller.state().forecast_status, RequestStatus::Failed);

        let notification = controller.state().notifications.latest().expect("notification");
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "Failed to fetch weather data");

        assert_eq!(controller.recent_searches().len(), 1);
        assert_eq!(controller.recent_searches()[0].name, "Tokyo");
        assert_eq!(controller.state().location.as_ref().map(|l| l.name.as_str()), Some("Tokyo"));

        let id = notification.id;
        assert!(controller.dismiss_notification(id));
        assert!(controller.state().notifications.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_a_forecast_failure() {
        let forecaster = Arc::new(GatedForecaster::default());
        let gate = forecaster.gate(48.85, Unit::Celsius);
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        let mut broken = payload(10.0);
        broken.daily.sunset.clear();
        controller.on_select_candidate(paris());
        gate.send(Ok(broken)).expect("gate open");
        controller.settle().await;

        assert!(controller.state().weather.is_none());
        assert_eq!(controller.state().notifications.len(), 1);
        assert!(controller.recent_searches().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_change_refetches_same_location() {
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(new_york());
        controller.settle().await;
        let celsius = controller.state().weather.clone().expect("snapshot");

        controller.on_unit_change(Unit::Fahrenheit);
        assert!(controller.state().is_loading());
        controller.settle().await;

        assert_eq!(
            forecaster.calls(),
            vec![(40.7, -74.0, Unit::Celsius), (40.7, -74.0, Unit::Fahrenheit)]
        );
        let fahrenheit = controller.state().weather.clone().expect("snapshot");
        assert_eq!(fahrenheit.city_name, celsius.city_name);
        assert_eq!(fahrenheit.coordinates(), celsius.coordinates());
        assert_eq!(fahrenheit.unit, Unit::Fahrenheit);
        assert_ne!(fahrenheit.current.temperature, celsius.current.temperature);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_change_without_location_only_updates_unit() {
        let mut forecaster = MockForecastClient::new();
        forecaster.expect_fetch().times(0);
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), Arc::new(forecaster)).await;

        controller.on_unit_change(Unit::Fahrenheit);
        assert_eq!(controller.state().unit, Unit::Fahrenheit);
        assert!(controller.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_change_to_same_unit_is_noop() {
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(paris());
        controller.settle().await;
        controller.on_unit_change(Unit::Celsius);

        assert!(controller.is_idle());
        assert_eq!(forecaster.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_retry_after_failed_refetch() {
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(new_york());
        controller.settle().await;

        let gate = forecaster.gate(40.7, Unit::Fahrenheit);
        controller.on_unit_change(Unit::Fahrenheit);
        gate.send(Err(ApiError::Network("connection reset".to_string())))
            .expect("gate open");
        controller.settle().await;

        assert_eq!(controller.state().unit, Unit::Fahrenheit);
        assert_eq!(
            controller.state().weather.as_ref().map(|w| w.unit),
            Some(Unit::Celsius)
        );

        // Same unit again: the snapshot is still Celsius, so this retries
        controller.on_unit_change(Unit::Fahrenheit);
        assert!(controller.state().is_loading());
        controller.settle().await;

        assert_eq!(
            forecaster.calls(),
            vec![
                (40.7, -74.0, Unit::Celsius),
                (40.7, -74.0, Unit::Fahrenheit),
                (40.7, -74.0, Unit::Fahrenheit),
            ]
        );
        let snapshot = controller.state().weather.as_ref().expect("snapshot");
        assert_eq!(snapshot.unit, Unit::Fahrenheit);
        assert_eq!(snapshot.city_name, "New York");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_change_supersedes_inflight_forecast() {
        let forecaster = Arc::new(GatedForecaster::default());
        let _celsius_gate = forecaster.gate(48.85, Unit::Celsius);
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(paris());
        controller.on_unit_change(Unit::Fahrenheit);
        controller.settle().await;

        let snapshot = controller.state().weather.as_ref().expect("snapshot");
        assert_eq!(snapshot.unit, Unit::Fahrenheit);
        assert_eq!(snapshot.city_name, "Paris");
        assert!(controller.state().notifications.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_recent_entry() {
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller =
            controller_with(Arc::new(FakeGeocoder::default()), forecaster.clone()).await;

        controller.on_select_candidate(paris());
        controller.settle().await;
        controller.on_select_candidate(tokyo());
        controller.settle().await;

        assert!(controller.on_select_recent(1));
        controller.settle().await;
        assert!(!controller.on_select_recent(5));

        assert_eq!(forecaster.calls().last(), Some(&(48.85, 2.35, Unit::Celsius)));
        assert_eq!(controller.recent_searches()[0].name, "Paris");
    }

    // ------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_loads_first_match() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![new_york()]));
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller = controller_with(geocoder.clone(), forecaster.clone()).await;

        controller.bootstrap("New York");
        controller.settle().await;

        assert_eq!(geocoder.calls(), vec!["New York".to_string()]);
        assert_eq!(forecaster.calls(), vec![(40.7, -74.0, Unit::Celsius)]);
        assert_eq!(
            controller.state().weather.as_ref().map(|w| w.city_name.as_str()),
            Some("New York")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_during_bootstrap_wins() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![paris()]));
        let forecaster = Arc::new(GatedForecaster::default());
        let mut controller = controller_with(geocoder, forecaster.clone()).await;

        controller.bootstrap("New York");
        controller.on_input_change("Par");
        controller.settle().await;

        assert!(forecaster.calls().is_empty());
        assert_eq!(controller.state().suggestions, vec![paris()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_pin_follows_snapshot_and_dark_mode() {
        let mut controller = controller_with(
            Arc::new(FakeGeocoder::default()),
            Arc::new(GatedForecaster::default()),
        )
        .await;

        controller.on_select_candidate(paris());
        controller.settle().await;
        controller.toggle_dark_mode();

        let pin = controller.state().map_pin().expect("pin");
        assert_eq!(pin.latitude, 48.85);
        assert_eq!(pin.longitude, 2.35);
        assert_eq!(pin.label, "Paris: 20°");
        assert!(pin.dark_mode);
    }
}
