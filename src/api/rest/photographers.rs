use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::actor::{require_admin, require_admin_or_self};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::assignment::Assignment;
use crate::models::photographer::{CalendarEntry, GeoPoint, PhotographerProfile};
use crate::state::AppState;
use crate::store::ProfileStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/photographers", post(create_photographer).get(list_photographers))
        .route("/photographers/:id/home", patch(update_home))
        .route("/photographers/:id/calendar", put(update_calendar))
        .route("/photographers/:id/assignments", get(list_photographer_assignments))
}

#[derive(Deserialize)]
pub struct CreatePhotographerRequest {
    /// User id from the auth system; generated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub home: Option<GeoPoint>,
    #[serde(default)]
    pub home_address: Option<String>,
    pub service_radius_km: f64,
}

#[derive(Deserialize)]
pub struct UpdateHomeRequest {
    pub home: Option<GeoPoint>,
    #[serde(default)]
    pub home_address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCalendarRequest {
    pub entries: Vec<CalendarEntry>,
}

async fn create_photographer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreatePhotographerRequest>,
) -> Result<Json<PhotographerProfile>, AppError> {
    require_admin(&actor)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !payload.service_radius_km.is_finite() || payload.service_radius_km <= 0.0 {
        return Err(AppError::Validation(
            "service_radius_km must be > 0".to_string(),
        ));
    }
    if let Some(home) = &payload.home {
        home.validate()?;
    }

    let profile = PhotographerProfile {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        name: payload.name.trim().to_string(),
        email: payload.email,
        city: payload.city,
        home: payload.home,
        home_address: payload.home_address,
        service_radius_km: payload.service_radius_km,
        calendar: Vec::new(),
        updated_at: Utc::now(),
    };

    state.profiles.insert(profile.clone()).await?;
    Ok(Json(profile))
}

async fn list_photographers(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<PhotographerProfile>>, AppError> {
    require_admin(&actor)?;
    Ok(Json(state.profiles.find_photographers_with_role().await?))
}

async fn update_home(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHomeRequest>,
) -> Result<Json<PhotographerProfile>, AppError> {
    require_admin_or_self(&actor, id)?;
    if let Some(home) = &payload.home {
        home.validate()?;
    }

    let profile = state
        .profiles
        .set_home(id, payload.home, payload.home_address)
        .await?;
    Ok(Json(profile))
}

async fn update_calendar(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCalendarRequest>,
) -> Result<Json<PhotographerProfile>, AppError> {
    require_admin_or_self(&actor, id)?;

    let profile = state.profiles.upsert_calendar(id, payload.entries).await?;
    Ok(Json(profile))
}

async fn list_photographer_assignments(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    require_admin_or_self(&actor, id)?;
    Ok(Json(state.lifecycle.list_for_photographer(id).await?))
}
