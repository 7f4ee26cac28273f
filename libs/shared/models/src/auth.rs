use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Resolve the authenticated user into the actor that drives role-gated
    /// scheduling operations. Doctors and pharmacists both act as providers.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|_| AppError::Auth("User id is not a valid UUID".to_string()))?;

        let role = match self.role.as_deref() {
            Some("patient") => ActorRole::Patient,
            Some("doctor") | Some("pharmacist") | Some("provider") => ActorRole::Provider,
            Some(other) => {
                return Err(AppError::Forbidden(format!(
                    "Role '{}' cannot use scheduling",
                    other
                )))
            }
            None => return Err(AppError::Forbidden("User has no role".to_string())),
        };

        Ok(Actor { id, role })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Provider,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Patient => write!(f, "patient"),
            ActorRole::Provider => write!(f, "provider"),
        }
    }
}

/// The current actor: who is asking, and in which role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn patient(id: Uuid) -> Self {
        Self { id, role: ActorRole::Patient }
    }

    pub fn provider(id: Uuid) -> Self {
        Self { id, role: ActorRole::Provider }
    }
}
