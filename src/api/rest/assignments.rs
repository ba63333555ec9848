use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::actor::require_admin;
use crate::engine::lifecycle::NewAssignment;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::assignment::{Assignment, Decision};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assignments", post(create_assignment).get(list_assignments))
        .route("/assignments/sweep", post(sweep_assignments))
        .route("/assignments/:id", get(get_assignment))
        .route("/assignments/:id/respond", post(respond_assignment))
        .route("/assignments/:id/complete", post(complete_assignment))
        .route("/assignments/:id/compensation", patch(update_compensation))
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub decision: Decision,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCompensationRequest {
    pub payment_amount: f64,
    #[serde(default)]
    pub travel_cost: f64,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub expired: usize,
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewAssignment>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state.lifecycle.create(&actor, payload).await?;
    Ok(Json(assignment))
}

/// Admins see every assignment, photographers only their own offers.
async fn list_assignments(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let assignments = if actor.is_admin() {
        state.lifecycle.list_all().await?
    } else {
        state.lifecycle.list_for_photographer(actor.user_id).await?
    };
    Ok(Json(assignments))
}

async fn get_assignment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state.lifecycle.get(id).await?;
    if !actor.is_admin() && assignment.photographer_id != actor.user_id {
        return Err(AppError::UnauthorizedTransition(
            "assignment belongs to another photographer".to_string(),
        ));
    }
    Ok(Json(assignment))
}

async fn respond_assignment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state
        .lifecycle
        .respond(&actor, id, payload.decision, payload.reason)
        .await?;
    Ok(Json(assignment))
}

async fn complete_assignment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(state.lifecycle.mark_completed(&actor, id).await?))
}

async fn update_compensation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompensationRequest>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state
        .lifecycle
        .update_compensation(&actor, id, payload.payment_amount, payload.travel_cost)
        .await?;
    Ok(Json(assignment))
}

async fn sweep_assignments(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<SweepResponse>, AppError> {
    require_admin(&actor)?;
    let expired = state.lifecycle.sweep_expired(Utc::now()).await?;
    Ok(Json(SweepResponse { expired }))
}
