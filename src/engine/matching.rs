use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{haversine_km, GeoDistanceProvider};
use crate::models::photographer::{GeoPoint, PhotographerProfile};
use crate::observability::metrics::Metrics;
use crate::store::{OrderStore, ProfileStore};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchResult {
    pub photographer_id: Uuid,
    pub name: String,
    pub email: String,
    pub distance_km: f64,
    pub is_available: bool,
    pub city: Option<String>,
    pub service_radius_km: f64,
}

pub struct AvailabilityMatcher {
    profiles: Arc<dyn ProfileStore>,
    orders: Arc<dyn OrderStore>,
    geo: Arc<dyn GeoDistanceProvider>,
    default_max_distance_km: f64,
    metrics: Metrics,
}

impl AvailabilityMatcher {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        orders: Arc<dyn OrderStore>,
        geo: Arc<dyn GeoDistanceProvider>,
        default_max_distance_km: f64,
        metrics: Metrics,
    ) -> Self {
        Self {
            profiles,
            orders,
            geo,
            default_max_distance_km,
            metrics,
        }
    }

    /// Ranks every locatable photographer whose distance to the shoot is
    /// within both `max_distance_km` and their own service radius. Closest
    /// first; ties ordered by photographer id. An empty list is a valid result.
    pub async fn find_candidates(
        &self,
        shoot: GeoPoint,
        scheduled_date: Option<NaiveDate>,
        max_distance_km: Option<f64>,
    ) -> Result<Vec<MatchResult>, AppError> {
        shoot.validate()?;
        let max_distance_km = max_distance_km.unwrap_or(self.default_max_distance_km);
        if !max_distance_km.is_finite() || max_distance_km < 0.0 {
            return Err(AppError::Validation(
                "max_distance_km must be a non-negative number".to_string(),
            ));
        }

        let start = Instant::now();
        let result = self.rank(shoot, scheduled_date, max_distance_km).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .candidate_search_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    /// Resolves the order's shoot coordinate, geocoding and persisting it when
    /// missing, then ranks candidates around it.
    pub async fn find_candidates_for_order(
        &self,
        order_id: Uuid,
        scheduled_date: Option<NaiveDate>,
        max_distance_km: Option<f64>,
    ) -> Result<Vec<MatchResult>, AppError> {
        let shoot = self.shoot_coordinate(order_id, false).await?;
        self.find_candidates(shoot, scheduled_date, max_distance_km)
            .await
    }

    /// Returns the order's shoot coordinate. With `force`, the stored
    /// coordinate is ignored and the address is geocoded again.
    pub async fn shoot_coordinate(&self, order_id: Uuid, force: bool) -> Result<GeoPoint, AppError> {
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let address = order.shoot_address.ok_or_else(|| {
            AppError::GeocodingFailure(format!("order {order_id} has no shoot address"))
        })?;

        if let (Some(point), false) = (address.coordinate, force) {
            return Ok(point);
        }

        let line = address.one_line();
        let point = self.geo.geocode(&line).await.map_err(|err| {
            warn!(order_id = %order_id, address = %line, error = %err, "shoot address geocoding failed");
            AppError::from(err)
        })?;
        point
            .validate()
            .map_err(|err| AppError::GeocodingFailure(err.to_string()))?;

        self.orders
            .update_shoot_coordinate(order_id, point, Utc::now())
            .await?;
        info!(order_id = %order_id, lat = point.lat, lng = point.lng, "shoot address geocoded");

        Ok(point)
    }

    async fn rank(
        &self,
        shoot: GeoPoint,
        scheduled_date: Option<NaiveDate>,
        max_distance_km: f64,
    ) -> Result<Vec<MatchResult>, AppError> {
        let photographers = self.profiles.find_photographers_with_role().await?;

        let located: Vec<(PhotographerProfile, GeoPoint)> = photographers
            .into_iter()
            .filter_map(|profile| match profile.home {
                Some(home) => Some((profile, home)),
                None => {
                    debug!(photographer_id = %profile.id, "skipping photographer without home coordinate");
                    None
                }
            })
            .collect();

        let distances = join_all(
            located
                .iter()
                .map(|(profile, home)| self.distance_km(profile.id, *home, shoot)),
        )
        .await;

        let mut candidates = Vec::new();
        for ((profile, _), distance_km) in located.into_iter().zip(distances) {
            let limit = max_distance_km.min(profile.service_radius_km);
            if distance_km > limit {
                continue;
            }

            let is_available = match scheduled_date {
                Some(date) => self
                    .profiles
                    .find_availability(profile.id, date)
                    .await?
                    .is_none_or(|entry| entry.is_available),
                None => true,
            };

            candidates.push(MatchResult {
                photographer_id: profile.id,
                name: profile.name,
                email: profile.email,
                distance_km,
                is_available,
                city: profile.city,
                service_radius_km: profile.service_radius_km,
            });
        }

        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.photographer_id.cmp(&b.photographer_id))
        });

        debug!(candidates = candidates.len(), max_distance_km, "candidate search finished");
        Ok(candidates)
    }

    async fn distance_km(&self, photographer_id: Uuid, home: GeoPoint, shoot: GeoPoint) -> f64 {
        match self.geo.route(home, shoot).await {
            Ok(estimate) => estimate.distance_km,
            Err(err) => {
                warn!(
                    photographer_id = %photographer_id,
                    error = %err,
                    "route lookup failed; using straight-line distance"
                );
                haversine_km(&home, &shoot)
            }
        }
    }
}
