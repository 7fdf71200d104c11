use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::EARTH_RADIUS_KM;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

/// A WGS84 position stored in map order (`[lng, lat]`), which is how the
/// mapping service and the persisted station records encode it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    lng: f64,
    lat: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn validated(lng: f64, lat: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lng, lat })
    }

    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        haversine_km((self.lat, self.lng), (other.lat, other.lng))
    }

    /// `lng,lat` as the mapping service expects it in query strings and paths.
    #[must_use]
    pub fn to_query_pair(self) -> String {
        format!("{},{}", self.lng, self.lat)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lng, coord.lat]
    }
}

/// Great-circle distance in kilometres between two `(lat, lon)` pairs given
/// in degrees.
#[must_use]
pub fn haversine_km(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let (lat1, lon1) = p1;
    let (lat2, lon2) = p2;

    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lon / 2.0).sin().powi(2);

    // rounding can push `a` marginally outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Rounds to one decimal place, the precision stations are listed with.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[must_use]
pub fn format_distance_km(km: f64) -> String {
    if !km.is_finite() || km < 0.0 {
        return "Unknown".to_string();
    }

    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.1} km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const VIZAG: Coordinate = Coordinate::new(83.3184, 17.7268);

    #[test]
    fn test_same_point_distance_is_zero() {
        assert_eq!(VIZAG.distance_km(VIZAG), 0.0);
    }

    #[test]
    fn test_london_paris_distance() {
        let london = Coordinate::new(-0.1278, 51.5074);
        let paris = Coordinate::new(2.3522, 48.8566);
        let distance = london.distance_km(paris);
        assert!((distance - 343.5).abs() < 10.0);
    }

    #[test]
    fn test_antipodal_distance() {
        let d = haversine_km((0.0, 0.0), (0.0, 180.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((d - expected).abs() < 1.0);
    }

    #[test]
    fn test_validated_rejects_bad_input() {
        assert!(matches!(
            Coordinate::validated(0.0, 91.0),
            Err(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinate::validated(-181.0, 0.0),
            Err(CoordinateError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinate::validated(f64::NAN, 0.0),
            Err(CoordinateError::NonFinite)
        ));
        assert!(Coordinate::validated(83.3184, 17.7268).is_ok());
    }

    #[test]
    fn test_serializes_in_map_order() {
        let json = serde_json::to_string(&VIZAG).unwrap();
        assert_eq!(json, "[83.3184,17.7268]");
        let back: Coordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VIZAG);
    }

    #[test]
    fn test_query_pair_is_lng_first() {
        assert_eq!(VIZAG.to_query_pair(), "83.3184,17.7268");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance_km(0.85), "850 m");
        assert_eq!(format_distance_km(1.0), "1.0 km");
        assert_eq!(format_distance_km(12.34), "12.3 km");
        assert_eq!(format_distance_km(f64::NAN), "Unknown");
        assert_eq!(format_distance_km(-1.0), "Unknown");
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(3.14159), 3.1);
        assert_eq!(round_to_tenth(2.96), 3.0);
    }

    fn lat() -> impl Strategy<Value = f64> {
        -90.0f64..=90.0
    }

    fn lon() -> impl Strategy<Value = f64> {
        -180.0f64..=180.0
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(a in (lat(), lon()), b in (lat(), lon())) {
            let ab = haversine_km(a, b);
            let ba = haversine_km(b, a);
            prop_assert!((ab - ba).abs() < 1e-9);
        }

        #[test]
        fn distance_to_self_is_zero(a in (lat(), lon())) {
            prop_assert!(haversine_km(a, a).abs() < 1e-9);
        }

        #[test]
        fn distance_is_bounded(a in (lat(), lon()), b in (lat(), lon())) {
            let d = haversine_km(a, b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
