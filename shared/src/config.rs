use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

pub const MAPBOX_API_BASE: &str = "https://api.mapbox.com";
pub const DEFAULT_COUNTRY: &str = "in";
pub const STATION_QUERY: &str = "electric vehicle charging station";
pub const TOKEN_PROBE_QUERY: &str = "visakhapatnam";
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 10_000;
pub const STATION_RESULT_LIMIT: u8 = 10;
pub const SUGGESTION_RESULT_LIMIT: u8 = 5;
pub const SUGGESTION_DEBOUNCE_MS: u64 = 500;
pub const GEOLOCATION_TIMEOUT_MS: u64 = 10_000;

/// Visakhapatnam city centre.
pub const DEFAULT_LOCATION: Coordinate = Coordinate::new(83.3184, 17.7268);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: GEOLOCATION_TIMEOUT_MS,
            maximum_age_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub mapbox_base_url: String,
    pub country: String,
    pub station_query: String,
    pub station_limit: u8,
    pub suggestion_limit: u8,
    pub search_radius_m: u32,
    pub suggestion_debounce_ms: u64,
    pub geolocation: GeolocationOptions,
    pub default_location: Coordinate,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            mapbox_base_url: MAPBOX_API_BASE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            station_query: STATION_QUERY.to_string(),
            station_limit: STATION_RESULT_LIMIT,
            suggestion_limit: SUGGESTION_RESULT_LIMIT,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            suggestion_debounce_ms: SUGGESTION_DEBOUNCE_MS,
            geolocation: GeolocationOptions::default(),
            default_location: DEFAULT_LOCATION,
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.mapbox_base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.mapbox_base_url, "https://api.mapbox.com");
        assert_eq!(config.search_radius_m, 10_000);
        assert_eq!(config.suggestion_debounce_ms, 500);
        assert!(config.geolocation.enable_high_accuracy);
        assert_eq!(config.geolocation.maximum_age_ms, 0);
    }

    #[test]
    fn test_base_url_override_keeps_other_defaults() {
        let config = DashboardConfig::default().with_base_url("http://localhost:8080");
        assert_eq!(config.mapbox_base_url, "http://localhost:8080");
        assert_eq!(config.search_radius_m, DEFAULT_SEARCH_RADIUS_M);
        assert_eq!(config.default_location, DEFAULT_LOCATION);
    }
}
