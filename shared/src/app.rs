use crux_http::HttpError;
use serde::{Deserialize, Serialize};

use crate::api_tokens::ApiToken;
use crate::battery::{self, BatteryBand, ChargeOutcome, DischargeOutcome};
use crate::capabilities::{Capabilities, GeolocationResult};
use crate::config::DashboardConfig;
use crate::geo::{format_distance_km, Coordinate};
use crate::mapbox::{self, AccessToken, DirectionsResponse, PlacesResponse};
use crate::model::{
    ApiTokenId, Model, NotificationId, RequestKind, Station, StationId, ToastKind, ToastMessage,
    TokenStatus, UnixTimeMs, Vehicle, VehicleId,
};
use crate::notifications::{self, Notification, NotificationDraft, Severity};
use crate::persistence::{self, StorageKey};
use crate::stations::{self, StationLocator};
use crate::vehicles::{self, VehicleFilter};
use crate::{AppError, AppResult, ErrorKind};

#[derive(Debug, Clone)]
pub enum Event {
    Noop,

    AppStarted,
    StorageLoaded {
        key: StorageKey,
        result: Result<Option<Vec<u8>>, String>,
    },
    StorageWritten {
        key: StorageKey,
        result: Result<(), String>,
    },
    ConfigUpdated(Box<DashboardConfig>),
    TimerTick {
        now_ms: u64,
    },
    ToastDismissed,

    VehicleFilterChanged(VehicleFilter),
    VehicleSaved(Option<VehicleId>),

    BatteryLevelSet(i32),
    ChargeSimulated,
    DischargeSimulated,

    NotificationRead(NotificationId),
    AllNotificationsRead,
    NotificationsCleared,
    TestNotificationRequested,

    CurrentLocationRequested,
    CurrentLocationReceived(GeolocationResult),
    DefaultLocationRequested,
    SearchQueryChanged(String),
    SuggestionDebounceElapsed {
        seq: u64,
    },
    SuggestionsFetched {
        seq: u64,
        result: AppResult<PlacesResponse>,
    },
    SuggestionSelected(usize),

    StationsRequested,
    StationsFetched {
        seq: u64,
        origin: Coordinate,
        result: AppResult<PlacesResponse>,
    },
    AvailabilityFilterToggled(bool),
    StationSelected(StationId),
    StationDeselected,
    DirectionsFetched {
        seq: u64,
        result: AppResult<DirectionsResponse>,
    },
    NavigationStarted,

    AccessTokenSubmitted(String),
    TokenProbeCompleted {
        seq: u64,
        result: AppResult<()>,
    },

    ApiTokenCreateRequested {
        name: String,
    },
    ApiTokenDeleted(ApiTokenId),
    ApiTokenUsed(ApiTokenId),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::StorageLoaded { .. } => "storage_loaded",
            Self::StorageWritten { .. } => "storage_written",
            Self::ConfigUpdated(_) => "config_updated",
            Self::TimerTick { .. } => "timer_tick",
            Self::ToastDismissed => "toast_dismissed",
            Self::VehicleFilterChanged(_) => "vehicle_filter_changed",
            Self::VehicleSaved(_) => "vehicle_saved",
            Self::BatteryLevelSet(_) => "battery_level_set",
            Self::ChargeSimulated => "charge_simulated",
            Self::DischargeSimulated => "discharge_simulated",
            Self::NotificationRead(_) => "notification_read",
            Self::AllNotificationsRead => "all_notifications_read",
            Self::NotificationsCleared => "notifications_cleared",
            Self::TestNotificationRequested => "test_notification_requested",
            Self::CurrentLocationRequested => "current_location_requested",
            Self::CurrentLocationReceived(_) => "current_location_received",
            Self::DefaultLocationRequested => "default_location_requested",
            Self::SearchQueryChanged(_) => "search_query_changed",
            Self::SuggestionDebounceElapsed { .. } => "suggestion_debounce_elapsed",
            Self::SuggestionsFetched { .. } => "suggestions_fetched",
            Self::SuggestionSelected(_) => "suggestion_selected",
            Self::StationsRequested => "stations_requested",
            Self::StationsFetched { .. } => "stations_fetched",
            Self::AvailabilityFilterToggled(_) => "availability_filter_toggled",
            Self::StationSelected(_) => "station_selected",
            Self::StationDeselected => "station_deselected",
            Self::DirectionsFetched { .. } => "directions_fetched",
            Self::NavigationStarted => "navigation_started",
            Self::AccessTokenSubmitted(_) => "access_token_submitted",
            Self::TokenProbeCompleted { .. } => "token_probe_completed",
            Self::ApiTokenCreateRequested { .. } => "api_token_create_requested",
            Self::ApiTokenDeleted(_) => "api_token_deleted",
            Self::ApiTokenUsed(_) => "api_token_used",
        }
    }
}

// --- View ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatteryView {
    pub percentage: u8,
    pub band: BatteryBand,
    pub status_label: String,
    pub estimated_range_km: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StationView {
    pub station: Station,
    pub distance_text: String,
    pub is_selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteStepView {
    pub instruction: String,
    pub distance_text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteView {
    pub distance_text: String,
    pub duration_minutes: u64,
    pub steps: Vec<RouteStepView>,
    pub line: geojson::Feature,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SuggestionView {
    pub label: String,
    pub center: Coordinate,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub vehicles: Vec<Vehicle>,
    pub vehicle_filter: VehicleFilter,
    pub selected_vehicle: Option<Vehicle>,
    pub battery: BatteryView,
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub user_location: Coordinate,
    pub is_locating: bool,
    pub search_query: String,
    pub suggestions: Vec<SuggestionView>,
    pub is_searching: bool,
    pub stations: Vec<StationView>,
    pub show_available_only: bool,
    pub is_loading_stations: bool,
    pub selected_station: Option<Station>,
    pub route: Option<RouteView>,
    pub can_start_navigation: bool,
    pub navigation_started: bool,
    pub token_status: TokenStatus,
    pub is_map_ready: bool,
    pub api_tokens: Vec<ApiToken>,
    pub toast: Option<ToastMessage>,
}

fn http_outcome<T>(result: crux_http::Result<crux_http::Response<T>>) -> AppResult<T> {
    match result {
        Ok(mut response) => {
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::from_http_status(u16::from(status), None));
            }
            response
                .take_body()
                .ok_or_else(|| AppError::new(ErrorKind::Deserialization, "Empty response body"))
        }
        Err(HttpError::Http { code, body, .. }) => {
            Err(AppError::from_http_status(u16::from(code), body.as_deref()))
        }
        Err(HttpError::Json(e)) => {
            Err(AppError::new(ErrorKind::Deserialization, "Unexpected response body").with_internal(e))
        }
        Err(HttpError::Timeout) => Err(AppError::new(ErrorKind::Timeout, "Request timed out")),
        Err(e) => Err(AppError::new(ErrorKind::Network, "Request failed").with_internal(e.to_string())),
    }
}

#[derive(Default)]
pub struct App;

impl App {
    fn persist(model: &Model, caps: &Capabilities, key: StorageKey) {
        match persistence::snapshot(model, key) {
            Ok(Some(bytes)) => {
                caps.kv.set(key.as_str().to_string(), bytes, move |result| {
                    Event::StorageWritten {
                        key,
                        result: result.map(|_| ()).map_err(|e| format!("{e:?}")),
                    }
                });
            }
            Ok(None) => {
                caps.kv.delete(key.as_str().to_string(), move |result| {
                    Event::StorageWritten {
                        key,
                        result: result.map(|_| ()).map_err(|e| format!("{e:?}")),
                    }
                });
            }
            Err(e) => {
                tracing::error!(key = key.as_str(), error = %e, "could not encode state for storage");
            }
        }
    }

    fn notify(model: &mut Model, caps: &Capabilities, draft: NotificationDraft) {
        model.add_notification(draft);
        Self::persist(model, caps, StorageKey::Notifications);
    }

    fn show_error(model: &mut Model, title: &str, error: &AppError) {
        tracing::warn!(code = error.code(), error = %error, "{title}");
        model.show_toast(title, Some(error.user_facing_message()), ToastKind::Error);
    }

    fn fetch_stations(model: &mut Model, caps: &Capabilities, origin: Coordinate) {
        let seq = model.requests.next(RequestKind::Stations);
        let request = StationLocator::new(&model.config, origin)
            .request_url(model.credentials.ready_token());

        match request {
            Ok(Some(url)) => {
                tracing::debug!(seq, "requesting stations");
                model.is_loading_stations = true;
                caps.http
                    .get(url)
                    .expect_json::<PlacesResponse>()
                    .send(move |result| Event::StationsFetched {
                        seq,
                        origin,
                        result: http_outcome(result),
                    });
            }
            Ok(None) => {
                tracing::info!("no validated access token, listing seed stations");
                let stations =
                    StationLocator::new(&model.config, origin).fallback(&mut rand::thread_rng());
                Self::finish_station_fetch(model, stations);
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not build station request, listing seed stations");
                let stations =
                    StationLocator::new(&model.config, origin).fallback(&mut rand::thread_rng());
                Self::finish_station_fetch(model, stations);
            }
        }
    }

    fn finish_station_fetch(model: &mut Model, stations: Vec<Station>) {
        let count = stations.len();
        model.session.set_stations(stations);
        model.is_loading_stations = false;
        model.show_toast(
            "Stations found",
            Some(format!("Found {count} charging stations nearby.")),
            ToastKind::Success,
        );
    }

    fn fetch_directions(model: &mut Model, caps: &Capabilities, destination: Coordinate) {
        // supersedes any route still in flight for a previous station
        let seq = model.requests.next(RequestKind::Directions);
        let Some(token) = model.credentials.ready_token() else {
            tracing::debug!("no validated access token, skipping directions");
            return;
        };
        let url = mapbox::directions_url(
            &model.config,
            model.session.user_location(),
            destination,
            token,
        );
        match url {
            Ok(url) => {
                caps.http
                    .get(url)
                    .expect_json::<DirectionsResponse>()
                    .send(move |result| Event::DirectionsFetched {
                        seq,
                        result: http_outcome(result),
                    });
            }
            Err(e) => Self::show_error(model, "Failed to fetch directions", &e.into()),
        }
    }

    fn probe_token(model: &mut Model, caps: &Capabilities, token: &AccessToken) {
        match mapbox::token_probe_url(&model.config, token) {
            Ok(url) => {
                let seq = model.requests.next(RequestKind::TokenProbe);
                model.credentials.set_token_status(TokenStatus::Validating);
                caps.http.get(url).send(move |result| Event::TokenProbeCompleted {
                    seq,
                    result: http_outcome(result).map(|_| ()),
                });
            }
            Err(e) => {
                model.credentials.set_token_status(TokenStatus::Invalid);
                Self::show_error(model, "Invalid Mapbox token", &e.into());
            }
        }
    }

    fn move_to(model: &mut Model, caps: &Capabilities, location: Coordinate) {
        model.session.set_user_location(location);
        Self::fetch_stations(model, caps, location);
    }

    fn set_battery(model: &mut Model, caps: &Capabilities, percentage: i32) {
        if let Some(alert) = model.session.set_battery_percentage(percentage) {
            Self::notify(model, caps, alert);
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[allow(clippy::too_many_lines)]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        model.update_timestamp();
        tracing::trace!(event = event.name(), "update");

        match event {
            Event::Noop => {}

            Event::AppStarted => {
                for key in StorageKey::ALL {
                    caps.kv.get(key.as_str().to_string(), move |result| Event::StorageLoaded {
                        key,
                        result: result.map_err(|e| format!("{e:?}")),
                    });
                }
                caps.render.render();
            }

            Event::StorageLoaded { key, result } => {
                match result {
                    Ok(bytes) => {
                        let had_live_entries = !model.session.notifications().is_empty();
                        let restored = persistence::restore(model, key, bytes.as_deref());
                        match key {
                            StorageKey::MapboxToken if restored => {
                                if let Some(token) = model.credentials.access_token().cloned() {
                                    Self::probe_token(model, caps, &token);
                                }
                            }
                            // alerts raised before the load already overwrote the stored ledger
                            StorageKey::Notifications if restored && had_live_entries => {
                                Self::persist(model, caps, StorageKey::Notifications);
                            }
                            _ => {}
                        }
                    }
                    Err(e) => {
                        tracing::warn!(key = key.as_str(), error = %e, "failed to read from storage");
                    }
                }
                caps.render.render();
            }

            Event::StorageWritten { key, result } => match result {
                Ok(()) => tracing::debug!(key = key.as_str(), "persisted"),
                Err(e) => tracing::error!(key = key.as_str(), error = %e, "failed to persist"),
            },

            Event::ConfigUpdated(config) => {
                tracing::info!(base_url = %config.mapbox_base_url, "configuration replaced");
                model.config = *config;
                caps.render.render();
            }

            Event::TimerTick { now_ms } => {
                model.view_timestamp_ms = now_ms;
                if model.active_toast.as_ref().is_some_and(|t| t.is_expired(now_ms)) {
                    model.clear_toast();
                    caps.render.render();
                }
            }

            Event::ToastDismissed => {
                model.clear_toast();
                caps.render.render();
            }

            Event::VehicleFilterChanged(filter) => {
                model.vehicle_filter = filter;
                caps.render.render();
            }

            Event::VehicleSaved(id) => {
                let vehicle = match id {
                    Some(id) => match vehicles::find(&id) {
                        Some(vehicle) => Some(vehicle),
                        None => {
                            let err = AppError::new(ErrorKind::NotFound, "Unknown vehicle")
                                .with_context("vehicle_id", id.as_str());
                            Self::show_error(model, "Vehicle not found", &err);
                            caps.render.render();
                            return;
                        }
                    },
                    None => None,
                };

                let description = match &vehicle {
                    Some(v) => format!("Your {} has been saved.", v.display_name()),
                    None => "Your vehicle selection has been cleared.".to_string(),
                };
                model.session.set_selected_vehicle(vehicle);
                Self::persist(model, caps, StorageKey::SelectedVehicle);
                model.show_toast("Vehicle saved successfully", Some(description), ToastKind::Success);
                caps.render.render();
            }

            Event::BatteryLevelSet(percentage) => {
                Self::set_battery(model, caps, percentage);
                caps.render.render();
            }

            Event::ChargeSimulated => {
                match battery::charge_step(model.session.battery()) {
                    ChargeOutcome::AlreadyFull => model.show_toast(
                        "Battery already full",
                        Some("Your vehicle battery is already at 100%.".into()),
                        ToastKind::Info,
                    ),
                    ChargeOutcome::Completed => {
                        Self::set_battery(model, caps, 100);
                        Self::notify(
                            model,
                            caps,
                            NotificationDraft::new(
                                "Charging Complete",
                                "Your vehicle is now fully charged.",
                                Severity::Success,
                            ),
                        );
                    }
                    ChargeOutcome::Charged(level) => {
                        Self::set_battery(model, caps, i32::from(level.percentage()));
                        model.show_toast(
                            "Charging in progress",
                            Some(format!("Battery charged to {}%", level.percentage())),
                            ToastKind::Success,
                        );
                    }
                }
                caps.render.render();
            }

            Event::DischargeSimulated => {
                match battery::discharge_step(model.session.battery()) {
                    DischargeOutcome::AlreadyEmpty => model.show_toast(
                        "Battery already empty",
                        Some("Your vehicle battery is already at 0%.".into()),
                        ToastKind::Info,
                    ),
                    DischargeOutcome::Discharged(level) => {
                        let pct = level.percentage();
                        match model.session.set_battery_percentage(i32::from(pct)) {
                            Some(alert) => Self::notify(model, caps, alert),
                            None => model.show_toast(
                                "Battery discharge simulated",
                                Some(format!("Battery level decreased to {pct}%")),
                                ToastKind::Info,
                            ),
                        }
                    }
                }
                caps.render.render();
            }

            Event::NotificationRead(id) => {
                if model.session.notifications_mut().mark_read(&id) {
                    Self::persist(model, caps, StorageKey::Notifications);
                }
                caps.render.render();
            }

            Event::AllNotificationsRead => {
                let flipped = model.session.notifications_mut().mark_all_read();
                if flipped > 0 {
                    Self::persist(model, caps, StorageKey::Notifications);
                }
                model.show_toast(
                    "Notifications marked as read",
                    Some("All notifications have been marked as read.".into()),
                    ToastKind::Success,
                );
                caps.render.render();
            }

            Event::NotificationsCleared => {
                model.session.notifications_mut().clear();
                Self::persist(model, caps, StorageKey::Notifications);
                model.show_toast(
                    "Notifications cleared",
                    Some("All notifications have been removed.".into()),
                    ToastKind::Success,
                );
                caps.render.render();
            }

            Event::TestNotificationRequested => {
                let draft = notifications::random_test_notification(&mut rand::thread_rng());
                Self::notify(model, caps, draft);
                caps.render.render();
            }

            Event::CurrentLocationRequested => {
                model.is_locating = true;
                caps.geolocation
                    .current_position(model.config.geolocation.clone(), Event::CurrentLocationReceived);
                caps.render.render();
            }

            Event::CurrentLocationReceived(result) => {
                model.is_locating = false;
                let location = result
                    .map_err(AppError::from)
                    .and_then(|p| Ok(Coordinate::validated(p.longitude, p.latitude)?));
                match location {
                    Ok(location) => {
                        model.show_toast(
                            "Location updated",
                            Some("Your current location has been updated on the map.".into()),
                            ToastKind::Success,
                        );
                        Self::move_to(model, caps, location);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "geolocation failed");
                        model.show_toast("Location error", Some(e.message.clone()), ToastKind::Error);
                    }
                }
                caps.render.render();
            }

            Event::DefaultLocationRequested => {
                model.show_toast(
                    "Location set to Visakhapatnam",
                    Some("Map has been centered on Visakhapatnam, Andhra Pradesh, India.".into()),
                    ToastKind::Success,
                );
                let location = model.config.default_location;
                Self::move_to(model, caps, location);
                caps.render.render();
            }

            Event::SearchQueryChanged(query) => {
                model.search.query = query;
                let seq = model.requests.next(RequestKind::Suggestions);
                if model.search.query.trim().is_empty() || model.credentials.ready_token().is_none() {
                    model.search.suggestions.clear();
                    model.search.is_searching = false;
                } else {
                    caps.delay.start(model.config.suggestion_debounce_ms, move || {
                        Event::SuggestionDebounceElapsed { seq }
                    });
                }
                caps.render.render();
            }

            Event::SuggestionDebounceElapsed { seq } => {
                if !model.requests.is_current(RequestKind::Suggestions, seq) {
                    tracing::debug!(seq, "superseded suggestion debounce");
                    return;
                }
                let Some(token) = model.credentials.ready_token() else {
                    return;
                };
                let url = mapbox::suggestion_url(
                    &model.config,
                    model.search.query.trim(),
                    model.session.user_location(),
                    token,
                );
                match url {
                    Ok(url) => {
                        model.search.is_searching = true;
                        caps.http
                            .get(url)
                            .expect_json::<PlacesResponse>()
                            .send(move |result| Event::SuggestionsFetched {
                                seq,
                                result: http_outcome(result),
                            });
                    }
                    Err(e) => Self::show_error(model, "Error", &e.into()),
                }
                caps.render.render();
            }

            Event::SuggestionsFetched { seq, result } => {
                if !model.requests.is_current(RequestKind::Suggestions, seq) {
                    tracing::debug!(seq, "discarding stale suggestions");
                    return;
                }
                model.search.is_searching = false;
                match result {
                    Ok(response) => model.search.suggestions = response.features,
                    Err(e) => {
                        tracing::warn!(error = %e, "suggestion lookup failed");
                        model.search.suggestions.clear();
                        model.show_toast(
                            "Error",
                            Some("Failed to fetch location suggestions.".into()),
                            ToastKind::Error,
                        );
                    }
                }
                caps.render.render();
            }

            Event::SuggestionSelected(index) => {
                let Some(feature) = model.search.suggestions.get(index).cloned() else {
                    tracing::warn!(index, "suggestion index out of range");
                    return;
                };
                // invalidate any in-flight lookup for the old query
                model.requests.next(RequestKind::Suggestions);
                model.search.reset();
                let label = feature
                    .place_name
                    .or(feature.text)
                    .unwrap_or_else(|| feature.center.to_query_pair());
                model.show_toast(
                    "Location updated",
                    Some(format!("Map has been centered on {label}.")),
                    ToastKind::Success,
                );
                Self::move_to(model, caps, feature.center);
                caps.render.render();
            }

            Event::StationsRequested => {
                let origin = model.session.user_location();
                Self::fetch_stations(model, caps, origin);
                caps.render.render();
            }

            Event::StationsFetched { seq, origin, result } => {
                if !model.requests.is_current(RequestKind::Stations, seq) {
                    tracing::debug!(seq, "discarding stale station results");
                    return;
                }
                let stations =
                    StationLocator::new(&model.config, origin).resolve(result, &mut rand::thread_rng());
                Self::finish_station_fetch(model, stations);
                caps.render.render();
            }

            Event::AvailabilityFilterToggled(only_available) => {
                model.show_available_only = only_available;
                caps.render.render();
            }

            Event::StationSelected(id) => {
                let Some(station) = model.session.find_station(&id).cloned() else {
                    tracing::warn!(station_id = %id, "selected station not in current list");
                    return;
                };
                model.show_toast(
                    "Station selected",
                    Some(format!("You've selected {}", station.name)),
                    ToastKind::Success,
                );
                let destination = station.coordinates;
                model.session.set_selected_station(Some(station));
                Self::fetch_directions(model, caps, destination);
                caps.render.render();
            }

            Event::StationDeselected => {
                model.requests.next(RequestKind::Directions);
                model.session.set_selected_station(None);
                caps.render.render();
            }

            Event::DirectionsFetched { seq, result } => {
                if !model.requests.is_current(RequestKind::Directions, seq) {
                    tracing::debug!(seq, "discarding stale directions");
                    return;
                }
                match result {
                    Ok(response) if response.primary_route().is_some() => {
                        model.session.set_route(Some(response));
                    }
                    Ok(_) => {
                        let err = AppError::new(ErrorKind::NotFound, "No route found");
                        Self::show_error(model, "Failed to fetch directions", &err);
                    }
                    Err(e) => Self::show_error(model, "Failed to fetch directions", &e),
                }
                caps.render.render();
            }

            Event::NavigationStarted => {
                let ready = model
                    .session
                    .selected_station()
                    .is_some_and(|s| s.available)
                    && model.session.route().is_some();
                if ready {
                    model.session.set_navigation_started(true);
                    model.show_toast(
                        "Navigation started",
                        Some("Turn-by-turn directions are now available".into()),
                        ToastKind::Success,
                    );
                } else {
                    model.show_toast(
                        "Navigation unavailable",
                        Some("Select an available station with a route first.".into()),
                        ToastKind::Warning,
                    );
                }
                caps.render.render();
            }

            Event::AccessTokenSubmitted(raw) => {
                if raw.trim().is_empty() {
                    model.requests.next(RequestKind::TokenProbe);
                    model.credentials.set_access_token(None);
                    Self::persist(model, caps, StorageKey::MapboxToken);
                    model.show_toast("Mapbox token cleared", None, ToastKind::Info);
                    caps.render.render();
                    return;
                }
                match AccessToken::parse(&raw) {
                    Ok(token) => {
                        model.credentials.set_access_token(Some(token.clone()));
                        Self::persist(model, caps, StorageKey::MapboxToken);
                        Self::probe_token(model, caps, &token);
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "rejected malformed access token");
                        model.show_toast(
                            "Invalid Mapbox token",
                            Some("The token should start with \"pk.\"".into()),
                            ToastKind::Error,
                        );
                    }
                }
                caps.render.render();
            }

            Event::TokenProbeCompleted { seq, result } => {
                if !model.requests.is_current(RequestKind::TokenProbe, seq) {
                    tracing::debug!(seq, "discarding stale token probe");
                    return;
                }
                match result {
                    Ok(()) => {
                        tracing::info!("access token accepted");
                        model.credentials.set_token_status(TokenStatus::Valid);
                        model.show_toast(
                            "Mapbox token saved",
                            Some("Your Mapbox token has been saved and validated.".into()),
                            ToastKind::Success,
                        );
                        if model.session.stations().is_empty() {
                            let origin = model.session.user_location();
                            Self::fetch_stations(model, caps, origin);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "access token rejected");
                        model.credentials.set_token_status(TokenStatus::Invalid);
                        model.show_toast(
                            "Invalid Mapbox token",
                            Some("The provided token seems to be invalid. Please check and try again.".into()),
                            ToastKind::Error,
                        );
                    }
                }
                caps.render.render();
            }

            Event::ApiTokenCreateRequested { name } => {
                let created = model
                    .credentials
                    .api_tokens_mut()
                    .create(&name, &mut rand::thread_rng(), UnixTimeMs::now())
                    .map(|t| t.name.clone());
                match created {
                    Ok(name) => {
                        Self::persist(model, caps, StorageKey::ApiTokens);
                        model.show_toast(
                            "New API token created",
                            Some(format!("Token \"{name}\" has been created.")),
                            ToastKind::Success,
                        );
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "api token not created");
                        model.show_toast(
                            "Please provide a name for your token",
                            None,
                            ToastKind::Error,
                        );
                    }
                }
                caps.render.render();
            }

            Event::ApiTokenDeleted(id) => {
                match model.credentials.api_tokens_mut().delete(&id) {
                    Ok(_) => {
                        Self::persist(model, caps, StorageKey::ApiTokens);
                        model.show_toast("Token deleted successfully", None, ToastKind::Success);
                    }
                    Err(e) => tracing::warn!(error = %e, "api token delete ignored"),
                }
                caps.render.render();
            }

            Event::ApiTokenUsed(id) => {
                match model
                    .credentials
                    .api_tokens_mut()
                    .mark_used(&id, UnixTimeMs::now())
                {
                    Ok(()) => Self::persist(model, caps, StorageKey::ApiTokens),
                    Err(e) => tracing::warn!(error = %e, "api token use ignored"),
                }
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let now_ms = model.view_timestamp_ms;
        let session = &model.session;
        let level = session.battery();
        let selected_id = session.selected_station().map(|s| &s.id);

        let stations = stations::visible_stations(session.stations(), model.show_available_only)
            .into_iter()
            .map(|station| StationView {
                distance_text: format_distance_km(station.distance),
                is_selected: Some(&station.id) == selected_id,
                station,
            })
            .collect();

        let route = session
            .route()
            .and_then(DirectionsResponse::primary_route)
            .map(|route| RouteView {
                distance_text: format_distance_km(route.distance / 1000.0),
                duration_minutes: (route.duration / 60.0).round() as u64,
                steps: route
                    .steps()
                    .map(|step| RouteStepView {
                        instruction: step.maneuver.instruction.clone(),
                        distance_text: step.distance_text(),
                    })
                    .collect(),
                line: route.to_feature(),
            });

        let suggestions = model
            .search
            .suggestions
            .iter()
            .map(|f| SuggestionView {
                label: f
                    .place_name
                    .clone()
                    .or_else(|| f.text.clone())
                    .unwrap_or_default(),
                center: f.center,
            })
            .collect();

        let can_start_navigation = !session.navigation_started()
            && session.selected_station().is_some_and(|s| s.available)
            && route.is_some();

        ViewModel {
            vehicles: model.vehicle_filter.apply(vehicles::catalog()),
            vehicle_filter: model.vehicle_filter,
            selected_vehicle: session.selected_vehicle().cloned(),
            battery: BatteryView {
                percentage: level.percentage(),
                band: level.band(),
                status_label: level.status_label().to_string(),
                estimated_range_km: level.estimated_range_km(),
            },
            notifications: session.notifications().iter().cloned().collect(),
            unread_count: session.notifications().unread_count(),
            user_location: session.user_location(),
            is_locating: model.is_locating,
            search_query: model.search.query.clone(),
            suggestions,
            is_searching: model.search.is_searching,
            stations,
            show_available_only: model.show_available_only,
            is_loading_stations: model.is_loading_stations,
            selected_station: session.selected_station().cloned(),
            route,
            can_start_navigation,
            navigation_started: session.navigation_started(),
            token_status: model.credentials.token_status(),
            is_map_ready: model.credentials.ready_token().is_some(),
            api_tokens: model.credentials.api_tokens().iter().cloned().collect(),
            toast: model
                .active_toast
                .clone()
                .filter(|t| !t.is_expired(now_ms)),
        }
    }
}
