use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::actor::require_admin;
use crate::engine::compensation::{TravelSuggestion, TripEndpoint};
use crate::engine::matching::MatchResult;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::assignment::Assignment;
use crate::models::order::{LineItem, Order, ShootAddress};
use crate::models::photographer::GeoPoint;
use crate::state::AppState;
use crate::store::{OrderStore, ProfileStore};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/geocode", post(geocode_order))
        .route("/orders/:id/candidates", get(order_candidates))
        .route("/orders/:id/compensation", get(suggest_compensation))
        .route("/orders/:id/assignments", get(order_assignments))
        .route("/candidates", get(coordinate_candidates))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub total_amount: f64,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shoot_address: Option<ShootAddress>,
}

#[derive(Deserialize)]
pub struct CandidateQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

#[derive(Deserialize)]
pub struct CoordinateCandidateQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

#[derive(Deserialize)]
pub struct CompensationQuery {
    pub photographer_id: Uuid,
}

#[derive(Serialize)]
pub struct CompensationSuggestion {
    pub photographer_id: Uuid,
    pub payment_amount: i64,
    pub travel: Option<TravelSuggestion>,
    pub total: f64,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    require_admin(&actor)?;

    if !payload.total_amount.is_finite() || payload.total_amount < 0.0 {
        return Err(AppError::Validation(
            "total_amount must be a non-negative number".to_string(),
        ));
    }
    if let Some(point) = payload
        .shoot_address
        .as_ref()
        .and_then(|address| address.coordinate)
    {
        point.validate()?;
    }

    let order = Order {
        id: Uuid::new_v4(),
        total_amount: payload.total_amount,
        items: payload.items,
        shoot_address: payload.shoot_address,
        unanswered_assignments: 0,
        created_at: Utc::now(),
    };

    state.orders.insert(order.clone()).await?;
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    require_admin(&actor)?;
    Ok(Json(load_order(&state, id).await?))
}

async fn geocode_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    require_admin(&actor)?;
    state.matcher.shoot_coordinate(id, true).await?;
    Ok(Json(load_order(&state, id).await?))
}

async fn order_candidates(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    require_admin(&actor)?;
    let candidates = state
        .matcher
        .find_candidates_for_order(id, query.date, query.max_distance_km)
        .await?;
    Ok(Json(candidates))
}

async fn coordinate_candidates(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<CoordinateCandidateQuery>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    require_admin(&actor)?;
    let shoot = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };
    let candidates = state
        .matcher
        .find_candidates(shoot, query.date, query.max_distance_km)
        .await?;
    Ok(Json(candidates))
}

async fn suggest_compensation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<CompensationQuery>,
) -> Result<Json<CompensationSuggestion>, AppError> {
    require_admin(&actor)?;

    let order = load_order(&state, id).await?;
    let profile = state
        .profiles
        .find(query.photographer_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("photographer {} not found", query.photographer_id))
        })?;

    let payment_amount = state.compensation.suggest_payment(&order.items);

    let shoot_line = order.shoot_address.as_ref().map(ShootAddress::one_line);
    let travel = state
        .compensation
        .suggest_travel(
            TripEndpoint {
                coordinate: profile.home,
                address: profile.home_address.as_deref(),
            },
            TripEndpoint {
                coordinate: order
                    .shoot_address
                    .as_ref()
                    .and_then(|address| address.coordinate),
                address: shoot_line.as_deref(),
            },
        )
        .await;

    let total = payment_amount as f64 + travel.map_or(0.0, |t| t.travel_cost);
    Ok(Json(CompensationSuggestion {
        photographer_id: profile.id,
        payment_amount,
        travel,
        total,
    }))
}

async fn order_assignments(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    require_admin(&actor)?;
    Ok(Json(state.lifecycle.list_for_order(id).await?))
}

async fn load_order(state: &AppState, id: Uuid) -> Result<Order, AppError> {
    state
        .orders
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}
