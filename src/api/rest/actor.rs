use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::Unauthenticated(format!("missing {name} header")))
        };

        let user_id = Uuid::parse_str(&header(USER_ID_HEADER)?)
            .map_err(|_| AppError::Unauthenticated(format!("{USER_ID_HEADER} is not a uuid")))?;
        let role = Role::parse(&header(USER_ROLE_HEADER)?)
            .ok_or_else(|| AppError::Unauthenticated(format!("unknown {USER_ROLE_HEADER}")))?;

        Ok(Actor { user_id, role })
    }
}

pub fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::UnauthorizedTransition(
            "admin role required".to_string(),
        ))
    }
}

/// Admins may act on anyone; photographers only on themselves.
pub fn require_admin_or_self(actor: &Actor, photographer_id: Uuid) -> Result<(), AppError> {
    if actor.is_admin() || actor.user_id == photographer_id {
        Ok(())
    } else {
        Err(AppError::UnauthorizedTransition(
            "photographers can only manage their own profile".to_string(),
        ))
    }
}
