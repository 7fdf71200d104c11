//! Charging-station discovery.
//!
//! The locator never fails: a missing token, a transport error, a non-2xx
//! status or an empty result set all resolve to the seed list, re-measured
//! from the caller's origin.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::DashboardConfig;
use crate::geo::{round_to_tenth, Coordinate};
use crate::mapbox::{self, AccessToken, PlaceFeature, PlacesResponse, RequestError};
use crate::model::{Station, StationId};
use crate::AppError;

pub const CONNECTOR_TYPES: [&str; 5] = ["CCS", "CHAdeMO", "Type 2", "Bharat AC", "Bharat DC"];
pub const AVAILABILITY_PROBABILITY: f64 = 0.7;

struct SeedStation {
    id: &'static str,
    name: &'static str,
    address: &'static str,
    lng: f64,
    lat: f64,
    available: bool,
    rating: f64,
    connectors: &'static [&'static str],
    price: &'static str,
}

const SEED_STATIONS: &[SeedStation] = &[
    SeedStation {
        id: "1",
        name: "Vizag Central EV Hub",
        address: "Dwaraka Nagar, Visakhapatnam, Andhra Pradesh",
        lng: 83.3000,
        lat: 17.7290,
        available: true,
        rating: 4.5,
        connectors: &["CCS", "Type 2"],
        price: "₹18.50/kWh",
    },
    SeedStation {
        id: "2",
        name: "Beach Road Charging Point",
        address: "RK Beach Road, Visakhapatnam, Andhra Pradesh",
        lng: 83.3390,
        lat: 17.7140,
        available: true,
        rating: 4.2,
        connectors: &["Bharat AC", "Type 2"],
        price: "₹16.00/kWh",
    },
    SeedStation {
        id: "3",
        name: "MVP Colony Power Station",
        address: "MVP Colony, Visakhapatnam, Andhra Pradesh",
        lng: 83.3330,
        lat: 17.7440,
        available: false,
        rating: 3.9,
        connectors: &["CCS", "CHAdeMO", "Bharat DC"],
        price: "₹19.25/kWh",
    },
    SeedStation {
        id: "4",
        name: "Gajuwaka EV Station",
        address: "Gajuwaka, Visakhapatnam, Andhra Pradesh",
        lng: 83.2140,
        lat: 17.6860,
        available: true,
        rating: 4.0,
        connectors: &["Bharat AC"],
        price: "₹15.75/kWh",
    },
    SeedStation {
        id: "5",
        name: "Madhurawada Fast Charge",
        address: "Madhurawada, Visakhapatnam, Andhra Pradesh",
        lng: 83.3720,
        lat: 17.8130,
        available: true,
        rating: 4.7,
        connectors: &["CCS", "CHAdeMO"],
        price: "₹19.90/kWh",
    },
    SeedStation {
        id: "6",
        name: "Rushikonda Charging Hub",
        address: "Rushikonda, Visakhapatnam, Andhra Pradesh",
        lng: 83.3850,
        lat: 17.7820,
        available: false,
        rating: 3.8,
        connectors: &["Type 2", "Bharat DC"],
        price: "₹17.40/kWh",
    },
];

/// The bundled station list as stored, with distances measured from the
/// default location.
#[must_use]
pub fn seed_stations() -> Vec<Station> {
    let origin = crate::config::DEFAULT_LOCATION;
    SEED_STATIONS
        .iter()
        .map(|seed| {
            let coordinates = Coordinate::new(seed.lng, seed.lat);
            Station {
                id: StationId::new(seed.id),
                name: seed.name.to_string(),
                distance: round_to_tenth(origin.distance_km(coordinates)),
                available: seed.available,
                rating: seed.rating,
                address: seed.address.to_string(),
                coordinates,
                connector_types: seed.connectors.iter().map(|c| (*c).to_string()).collect(),
                price: seed.price.to_string(),
            }
        })
        .collect()
}

fn sort_by_distance(stations: &mut [Station]) {
    stations.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

fn random_connectors<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let count = rng.gen_range(1..=3);
    CONNECTOR_TYPES
        .choose_multiple(rng, count)
        .map(|c| (*c).to_string())
        .collect()
}

fn random_rating<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round_to_tenth(rng.gen_range(3.5..=5.0))
}

fn random_price<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("₹{:.2}/kWh", rng.gen_range(15.0..20.0))
}

/// Locates stations around one origin.
#[derive(Debug, Clone, Copy)]
pub struct StationLocator<'a> {
    config: &'a DashboardConfig,
    origin: Coordinate,
}

impl<'a> StationLocator<'a> {
    #[must_use]
    pub fn new(config: &'a DashboardConfig, origin: Coordinate) -> Self {
        Self { config, origin }
    }

    /// The places request for this origin, or `None` when there is no usable
    /// token and the caller should go straight to [`Self::fallback`].
    pub fn request_url(&self, token: Option<&AccessToken>) -> Result<Option<String>, RequestError> {
        match token {
            Some(token) => {
                mapbox::station_search_url(self.config, self.origin, token, self.config.search_radius_m)
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// Turns whatever the places request produced into a sorted station list.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        outcome: Result<PlacesResponse, AppError>,
        rng: &mut R,
    ) -> Vec<Station> {
        match outcome {
            Ok(response) if !response.features.is_empty() => {
                tracing::debug!(count = response.features.len(), "stations found via places search");
                self.from_features(&response.features, rng)
            }
            Ok(_) => {
                tracing::info!("no stations returned by places search, using seed list");
                self.fallback(rng)
            }
            Err(e) => {
                tracing::warn!(error = %e, "station search failed, using seed list");
                self.fallback(rng)
            }
        }
    }

    /// Seed list re-measured from the origin with availability re-rolled.
    pub fn fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Station> {
        let mut stations: Vec<Station> = seed_stations()
            .into_iter()
            .map(|mut station| {
                station.distance = round_to_tenth(self.origin.distance_km(station.coordinates));
                station.available = rng.gen_bool(AVAILABILITY_PROBABILITY);
                station
            })
            .collect();
        sort_by_distance(&mut stations);
        stations
    }

    fn from_features<R: Rng + ?Sized>(&self, features: &[PlaceFeature], rng: &mut R) -> Vec<Station> {
        let mut stations: Vec<Station> = features
            .iter()
            .enumerate()
            .map(|(i, feature)| Station {
                id: StationId::new(
                    feature
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("station-{i}")),
                ),
                name: feature
                    .text
                    .clone()
                    .unwrap_or_else(|| format!("Charging Station {}", i + 1)),
                distance: round_to_tenth(self.origin.distance_km(feature.center)),
                available: rng.gen_bool(AVAILABILITY_PROBABILITY),
                rating: random_rating(rng),
                address: feature
                    .place_name
                    .clone()
                    .unwrap_or_else(|| "Unknown location".to_string()),
                coordinates: feature.center,
                connector_types: random_connectors(rng),
                price: random_price(rng),
            })
            .collect();
        sort_by_distance(&mut stations);
        stations
    }
}

/// Stations the list view should show.
#[must_use]
pub fn visible_stations(stations: &[Station], available_only: bool) -> Vec<Station> {
    stations
        .iter()
        .filter(|s| !available_only || s.available)
        .cloned()
        .collect()
}
