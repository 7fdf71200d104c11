//! Mapbox request construction and response shapes.
//!
//! Only the fields the dashboard reads are modelled; everything else in the
//! geocoding and directions payloads is ignored during deserialization.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::{DashboardConfig, TOKEN_PROBE_QUERY};
use crate::geo::{format_distance_km, Coordinate};

pub const PUBLIC_TOKEN_PREFIX: &str = "pk.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("access token cannot be empty")]
    Empty,
    #[error("access token must start with pk. (public token)")]
    NotPublic,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// A public Mapbox access token whose format has been checked.
#[derive(Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, TokenError> {
        let token = raw.as_ref().trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if !token.starts_with(PUBLIC_TOKEN_PREFIX) {
            return Err(TokenError::NotPublic);
        }
        Ok(Self(SecretString::new(token.to_string())))
    }

    /// Raw token text, for request URLs and storage only.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self(SecretString::new(self.expose_secret().to_string()))
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for AccessToken {}

impl TryFrom<String> for AccessToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.expose_secret().to_string()
    }
}

fn base_url(config: &DashboardConfig) -> Result<Url, RequestError> {
    let url = Url::parse(&config.mapbox_base_url).map_err(|e| RequestError::InvalidBaseUrl {
        url: config.mapbox_base_url.clone(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(RequestError::InvalidBaseUrl {
            url: config.mapbox_base_url.clone(),
            reason: "cannot be a base".to_string(),
        });
    }
    Ok(url)
}

fn with_segments(mut url: Url, segments: &[&str]) -> Result<Url, RequestError> {
    let base = url.to_string();
    url.path_segments_mut()
        .map_err(|()| RequestError::InvalidBaseUrl {
            url: base,
            reason: "cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn places_url(config: &DashboardConfig, query: &str) -> Result<Url, RequestError> {
    let file = format!("{query}.json");
    with_segments(base_url(config)?, &["geocoding", "v5", "mapbox.places", &file])
}

/// Proximity search for charging points around `origin`.
pub fn station_search_url(
    config: &DashboardConfig,
    origin: Coordinate,
    token: &AccessToken,
    radius_m: u32,
) -> Result<String, RequestError> {
    let mut url = places_url(config, &config.station_query)?;
    url.query_pairs_mut()
        .append_pair("proximity", &origin.to_query_pair())
        .append_pair("radius", &radius_m.to_string())
        .append_pair("access_token", token.expose_secret())
        .append_pair("limit", &config.station_limit.to_string())
        .append_pair("country", &config.country);
    Ok(url.into())
}

/// Forward geocoding for the location search box.
pub fn suggestion_url(
    config: &DashboardConfig,
    query: &str,
    proximity: Coordinate,
    token: &AccessToken,
) -> Result<String, RequestError> {
    let mut url = places_url(config, query)?;
    url.query_pairs_mut()
        .append_pair("country", &config.country)
        .append_pair("proximity", &proximity.to_query_pair())
        .append_pair("access_token", token.expose_secret())
        .append_pair("limit", &config.suggestion_limit.to_string());
    Ok(url.into())
}

pub fn directions_url(
    config: &DashboardConfig,
    from: Coordinate,
    to: Coordinate,
    token: &AccessToken,
) -> Result<String, RequestError> {
    let waypoints = format!("{};{}", from.to_query_pair(), to.to_query_pair());
    let mut url = with_segments(
        base_url(config)?,
        &["directions", "v5", "mapbox", "driving", &waypoints],
    )?;
    url.query_pairs_mut()
        .append_pair("steps", "true")
        .append_pair("geometries", "geojson")
        .append_pair("access_token", token.expose_secret());
    Ok(url.into())
}

/// A cheap geocoding call whose only purpose is to learn whether the
/// service accepts the token.
pub fn token_probe_url(config: &DashboardConfig, token: &AccessToken) -> Result<String, RequestError> {
    let mut url = places_url(config, TOKEN_PROBE_QUERY)?;
    url.query_pairs_mut()
        .append_pair("access_token", token.expose_secret());
    Ok(url.into())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub features: Vec<PlaceFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceFeature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub place_name: Option<String>,
    pub center: Coordinate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

impl DirectionsResponse {
    #[must_use]
    pub fn primary_route(&self) -> Option<&DirectionsRoute> {
        self.routes.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub geometry: geojson::Geometry,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

impl DirectionsRoute {
    pub fn steps(&self) -> impl Iterator<Item = &RouteStep> {
        self.legs.iter().flat_map(|leg| leg.steps.iter())
    }

    /// The route line as a GeoJSON feature, ready for a map line layer.
    #[must_use]
    pub fn to_feature(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(self.geometry.clone()),
            id: None,
            properties: Some(geojson::JsonObject::new()),
            foreign_members: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    pub maneuver: StepManeuver,
}

impl RouteStep {
    #[must_use]
    pub fn distance_text(&self) -> String {
        format_distance_km(self.distance / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepManeuver {
    #[serde(default)]
    pub instruction: String,
}
