use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::geo::GeoError;
use crate::store::StoreError;

pub const STALE_OFFER_MESSAGE: &str = "this offer is no longer valid";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("transition not allowed: {0}")]
    UnauthorizedTransition(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{STALE_OFFER_MESSAGE}")]
    StaleAssignment,

    #[error("geocoding failed: {0}")]
    GeocodingFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::UnauthorizedTransition(_) => "unauthorized_transition",
            AppError::Conflict(_) => "conflict",
            AppError::StaleAssignment => "stale_assignment",
            AppError::GeocodingFailure(_) => "geocoding_failure",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::UnauthorizedTransition(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::StaleAssignment => (StatusCode::CONFLICT, STALE_OFFER_MESSAGE.to_string()),
            AppError::GeocodingFailure(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Unavailable(msg) => AppError::Internal(format!("store unavailable: {msg}")),
        }
    }
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        AppError::GeocodingFailure(err.to_string())
    }
}
