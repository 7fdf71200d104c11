use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::api_tokens::ApiTokenRegistry;
use crate::battery::{self, BatteryLevel};
use crate::config::DashboardConfig;
use crate::geo::Coordinate;
use crate::mapbox::{AccessToken, DirectionsResponse, PlaceFeature};
use crate::notifications::{NotificationDraft, NotificationLedger};
use crate::vehicles::VehicleFilter;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(VehicleId);
typed_id!(StationId);
typed_id!(NotificationId);
typed_id!(ApiTokenId);

// --- Time ---

#[must_use]
pub fn get_current_time_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Milliseconds since the Unix epoch.
///
/// Stored as an RFC 3339 string (`2024-04-05T19:34:38.901Z`), the format the
/// web dashboard has always written. Plain millisecond numbers are accepted
/// on read as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(get_current_time_ms())
    }

    fn to_datetime(self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

impl Serialize for UnixTimeMs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_datetime() {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_u64(self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for UnixTimeMs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Millis(ms) => Ok(Self(ms)),
            RawTimestamp::Text(text) => {
                let parsed = DateTime::parse_from_rfc3339(&text).map_err(D::Error::custom)?;
                u64::try_from(parsed.timestamp_millis())
                    .map(Self)
                    .map_err(|_| D::Error::custom(format!("timestamp before 1970: {text}")))
            }
        }
    }
}

impl Default for UnixTimeMs {
    fn default() -> Self {
        Self::now()
    }
}

// --- Domain records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleCategory {
    #[serde(rename = "bike")]
    TwoWheeler,
    #[serde(rename = "car")]
    FourWheeler,
    #[serde(rename = "big")]
    EightWheeler,
}

impl VehicleCategory {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TwoWheeler => "2-Wheeler",
            Self::FourWheeler => "4-Wheeler",
            Self::EightWheeler => "8-Wheeler",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub category: VehicleCategory,
    pub image: String,
}

impl Vehicle {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub name: String,
    /// Kilometres from the origin of the search that produced this record.
    pub distance: f64,
    pub available: bool,
    pub rating: f64,
    pub address: String,
    pub coordinates: Coordinate,
    pub connector_types: Vec<String>,
    pub price: String,
}

// --- Toasts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub title: String,
    pub description: Option<String>,
    pub kind: ToastKind,
    pub created_at_ms: u64,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(title: impl Into<String>, description: Option<String>, kind: ToastKind) -> Self {
        Self {
            title: title.into(),
            description,
            kind,
            created_at_ms: get_current_time_ms(),
            duration_ms: kind.default_duration_ms(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > self.duration_ms
    }
}

// --- Outstanding requests ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Stations,
    Suggestions,
    Directions,
    TokenProbe,
}

/// Hands out one increasing sequence number per request class so a late
/// response can be recognised as superseded and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTracker {
    stations: u64,
    suggestions: u64,
    directions: u64,
    token_probe: u64,
}

impl RequestTracker {
    fn slot(&mut self, kind: RequestKind) -> &mut u64 {
        match kind {
            RequestKind::Stations => &mut self.stations,
            RequestKind::Suggestions => &mut self.suggestions,
            RequestKind::Directions => &mut self.directions,
            RequestKind::TokenProbe => &mut self.token_probe,
        }
    }

    pub fn next(&mut self, kind: RequestKind) -> u64 {
        let slot = self.slot(kind);
        *slot = slot.wrapping_add(1);
        *slot
    }

    #[must_use]
    pub fn latest(&self, kind: RequestKind) -> u64 {
        match kind {
            RequestKind::Stations => self.stations,
            RequestKind::Suggestions => self.suggestions,
            RequestKind::Directions => self.directions,
            RequestKind::TokenProbe => self.token_probe,
        }
    }

    #[must_use]
    pub fn is_current(&self, kind: RequestKind, seq: u64) -> bool {
        self.latest(kind) == seq
    }
}

// --- State containers ---

/// Browsing state shared by every screen. Only the vehicle selection and
/// the notification ledger outlive the process; everything else starts
/// over on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    selected_vehicle: Option<Vehicle>,
    battery: BatteryLevel,
    notifications: NotificationLedger,
    user_location: Coordinate,
    stations: Vec<Station>,
    selected_station: Option<Station>,
    route: Option<DirectionsResponse>,
    navigation_started: bool,
}

impl SessionState {
    #[must_use]
    pub fn new(initial_location: Coordinate) -> Self {
        Self {
            selected_vehicle: None,
            battery: BatteryLevel::default(),
            notifications: NotificationLedger::default(),
            user_location: initial_location,
            stations: Vec::new(),
            selected_station: None,
            route: None,
            navigation_started: false,
        }
    }

    #[must_use]
    pub fn selected_vehicle(&self) -> Option<&Vehicle> {
        self.selected_vehicle.as_ref()
    }

    pub fn set_selected_vehicle(&mut self, vehicle: Option<Vehicle>) {
        self.selected_vehicle = vehicle;
    }

    #[must_use]
    pub fn battery(&self) -> BatteryLevel {
        self.battery
    }

    /// Replaces the battery level and runs the threshold rule against the
    /// previous value.
    pub fn set_battery_percentage(&mut self, percentage: i32) -> Option<NotificationDraft> {
        let previous = self.battery;
        self.battery = BatteryLevel::new(percentage);
        battery::threshold_alert(previous, self.battery)
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationLedger {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationLedger {
        &mut self.notifications
    }

    #[must_use]
    pub fn user_location(&self) -> Coordinate {
        self.user_location
    }

    pub fn set_user_location(&mut self, location: Coordinate) {
        self.user_location = location;
    }

    #[must_use]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn set_stations(&mut self, stations: Vec<Station>) {
        self.stations = stations;
    }

    #[must_use]
    pub fn find_station(&self, id: &StationId) -> Option<&Station> {
        self.stations.iter().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn selected_station(&self) -> Option<&Station> {
        self.selected_station.as_ref()
    }

    pub fn set_selected_station(&mut self, station: Option<Station>) {
        self.selected_station = station;
        self.route = None;
        self.navigation_started = false;
    }

    #[must_use]
    pub fn route(&self) -> Option<&DirectionsResponse> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Option<DirectionsResponse>) {
        self.route = route;
    }

    #[must_use]
    pub fn navigation_started(&self) -> bool {
        self.navigation_started
    }

    pub fn set_navigation_started(&mut self, started: bool) {
        self.navigation_started = started;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LOCATION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    #[default]
    Missing,
    Validating,
    Valid,
    Invalid,
}

impl TokenStatus {
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialState {
    access_token: Option<AccessToken>,
    token_status: TokenStatus,
    api_tokens: ApiTokenRegistry,
}

impl CredentialState {
    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// The token, but only once the mapping service has accepted it.
    #[must_use]
    pub fn ready_token(&self) -> Option<&AccessToken> {
        self.access_token
            .as_ref()
            .filter(|_| self.token_status.is_ready())
    }

    pub fn set_access_token(&mut self, token: Option<AccessToken>) {
        self.token_status = if token.is_some() {
            TokenStatus::Validating
        } else {
            TokenStatus::Missing
        };
        self.access_token = token;
    }

    #[must_use]
    pub fn token_status(&self) -> TokenStatus {
        self.token_status
    }

    pub fn set_token_status(&mut self, status: TokenStatus) {
        self.token_status = status;
    }

    #[must_use]
    pub fn api_tokens(&self) -> &ApiTokenRegistry {
        &self.api_tokens
    }

    pub fn api_tokens_mut(&mut self) -> &mut ApiTokenRegistry {
        &mut self.api_tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationSearch {
    pub query: String,
    pub suggestions: Vec<PlaceFeature>,
    pub is_searching: bool,
}

impl LocationSearch {
    pub fn reset(&mut self) {
        self.query.clear();
        self.suggestions.clear();
        self.is_searching = false;
    }
}

#[derive(Debug)]
pub struct Model {
    pub session: SessionState,
    pub credentials: CredentialState,
    pub config: DashboardConfig,
    pub vehicle_filter: VehicleFilter,
    pub show_available_only: bool,
    pub search: LocationSearch,
    pub requests: RequestTracker,
    pub is_loading_stations: bool,
    pub is_locating: bool,
    pub active_toast: Option<ToastMessage>,
    pub view_timestamp_ms: u64,
}

impl Default for Model {
    fn default() -> Self {
        let config = DashboardConfig::default();
        Self {
            session: SessionState::new(config.default_location),
            credentials: CredentialState::default(),
            config,
            vehicle_filter: VehicleFilter::default(),
            show_available_only: false,
            search: LocationSearch::default(),
            requests: RequestTracker::default(),
            is_loading_stations: false,
            is_locating: false,
            active_toast: None,
            view_timestamp_ms: get_current_time_ms(),
        }
    }
}

impl Model {
    pub fn update_timestamp(&mut self) {
        self.view_timestamp_ms = get_current_time_ms();
    }

    pub fn show_toast(&mut self, title: impl Into<String>, description: Option<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(title, description, kind));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    /// Appends to the ledger and mirrors the entry as a toast.
    pub fn add_notification(&mut self, draft: NotificationDraft) {
        let kind = draft.severity.toast_kind();
        let entry = self.session.notifications_mut().add(draft);
        self.active_toast = Some(ToastMessage::new(
            entry.title.clone(),
            Some(entry.message.clone()),
            kind,
        ));
    }
}
