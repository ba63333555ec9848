use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{GeoDistanceProvider, GeoError, RouteEstimate, StraightLineProvider};
use crate::models::photographer::GeoPoint;

/// Nominatim-style geocoder plus OSRM-style router. Either side may be left
/// unconfigured; routing then falls back to straight-line distance.
#[derive(Clone)]
pub struct HttpGeoProvider {
    client: Client,
    geocoder_url: Option<String>,
    routing_url: Option<String>,
    fallback: StraightLineProvider,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

impl HttpGeoProvider {
    pub fn new(
        geocoder_url: Option<String>,
        routing_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("shoot-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GeoError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            geocoder_url: geocoder_url.map(|url| url.trim_end_matches('/').to_string()),
            routing_url: routing_url.map(|url| url.trim_end_matches('/').to_string()),
            fallback: StraightLineProvider::default(),
        })
    }
}

#[async_trait]
impl GeoDistanceProvider for HttpGeoProvider {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        let base = self
            .geocoder_url
            .as_deref()
            .ok_or(GeoError::Unsupported("geocoding requires GEOCODER_URL"))?;

        let hits: Vec<SearchHit> = self
            .client
            .get(format!("{base}/search"))
            .query(&[("format", "json"), ("limit", "1"), ("q", address)])
            .send()
            .await
            .map_err(|err| GeoError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| GeoError::Transport(err.to_string()))?
            .json()
            .await
            .map_err(|err| GeoError::Decode(err.to_string()))?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::NoMatch(address.to_string()))?;

        let point = GeoPoint {
            lat: hit
                .lat
                .parse()
                .map_err(|err| GeoError::Decode(format!("lat: {err}")))?,
            lng: hit
                .lon
                .parse()
                .map_err(|err| GeoError::Decode(format!("lon: {err}")))?,
        };

        debug!(address, lat = point.lat, lng = point.lng, "address geocoded");
        Ok(point)
    }

    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, GeoError> {
        let Some(base) = self.routing_url.as_deref() else {
            return self.fallback.route(from, to).await;
        };

        let url = format!(
            "{base}/route/v1/driving/{},{};{},{}",
            from.lng, from.lat, to.lng, to.lat
        );

        let response: RouteResponse = self
            .client
            .get(url)
            .query(&[("overview", "false")])
            .send()
            .await
            .map_err(|err| GeoError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| GeoError::Transport(err.to_string()))?
            .json()
            .await
            .map_err(|err| GeoError::Decode(err.to_string()))?;

        if response.code != "Ok" {
            return Err(GeoError::Decode(format!("routing code {}", response.code)));
        }

        let route = response
            .routes
            .first()
            .ok_or_else(|| GeoError::Decode("routing response without routes".to_string()))?;

        Ok(RouteEstimate {
            distance_km: route.distance / 1000.0,
            duration_min: route.duration / 60.0,
        })
    }
}
