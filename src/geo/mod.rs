pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::photographer::GeoPoint;

pub use http::HttpGeoProvider;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const DEFAULT_AVERAGE_SPEED_KMH: f64 = 50.0;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("no match for address: {0}")]
    NoMatch(String),

    #[error("geo provider transport error: {0}")]
    Transport(String),

    #[error("unexpected geo provider response: {0}")]
    Decode(String),

    #[error("operation not supported by this provider: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_min: f64,
}

/// Geocoding and road-distance collaborator. Callers treat every failure as
/// recoverable and degrade to a manual flow.
#[async_trait]
pub trait GeoDistanceProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError>;
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, GeoError>;
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn straight_line_estimate(from: &GeoPoint, to: &GeoPoint, average_speed_kmh: f64) -> RouteEstimate {
    let distance_km = haversine_km(from, to);
    let duration_min = if average_speed_kmh > 0.0 {
        distance_km / average_speed_kmh * 60.0
    } else {
        0.0
    };

    RouteEstimate {
        distance_km,
        duration_min,
    }
}

/// Great-circle fallback used when no routing service is configured.
#[derive(Debug, Clone)]
pub struct StraightLineProvider {
    average_speed_kmh: f64,
}

impl StraightLineProvider {
    pub fn new(average_speed_kmh: f64) -> Self {
        Self { average_speed_kmh }
    }
}

impl Default for StraightLineProvider {
    fn default() -> Self {
        Self::new(DEFAULT_AVERAGE_SPEED_KMH)
    }
}

#[async_trait]
impl GeoDistanceProvider for StraightLineProvider {
    async fn geocode(&self, _address: &str) -> Result<GeoPoint, GeoError> {
        Err(GeoError::Unsupported("geocoding requires GEOCODER_URL"))
    }

    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, GeoError> {
        Ok(straight_line_estimate(&from, &to, self.average_speed_kmh))
    }
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, GeoDistanceProvider, GeoError, StraightLineProvider};
    use crate::models::photographer::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 52.3676,
            lng: 4.9041,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn amsterdam_to_rotterdam_is_around_57_km() {
        let amsterdam = GeoPoint {
            lat: 52.3676,
            lng: 4.9041,
        };
        let rotterdam = GeoPoint {
            lat: 51.9244,
            lng: 4.4777,
        };
        let distance = haversine_km(&amsterdam, &rotterdam);
        assert!((distance - 57.0).abs() < 3.0);
    }

    #[tokio::test]
    async fn straight_line_provider_estimates_duration_from_speed() {
        let provider = StraightLineProvider::new(60.0);
        let from = GeoPoint { lat: 0.0, lng: 0.0 };
        let to = GeoPoint { lat: 0.0, lng: 1.0 };

        let estimate = provider.route(from, to).await.unwrap();

        assert!((estimate.distance_km - 111.19).abs() < 0.5);
        assert!((estimate.duration_min - estimate.distance_km).abs() < 1e-9);
    }

    #[tokio::test]
    async fn straight_line_provider_cannot_geocode() {
        let provider = StraightLineProvider::default();
        let result = provider.geocode("Damrak 1, Amsterdam").await;
        assert!(matches!(result, Err(GeoError::Unsupported(_))));
    }
}
