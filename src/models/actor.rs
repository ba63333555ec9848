use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Photographer,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "photographer" => Some(Role::Photographer),
            _ => None,
        }
    }
}

/// Authenticated caller, as resolved by the upstream auth layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn photographer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Photographer,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
