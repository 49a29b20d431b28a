use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{User, UserRole};

/// Wire form of a successful authentication. The token is opaque to the
/// caller; claims are never exposed directly.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub email: String,
}

impl AuthResponse {
    pub fn bearer(token: String, email: String) -> Self {
        Self {
            token,
            token_type: "Bearer",
            email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub roles: Vec<UserRole>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id_hex(),
            email: user.email,
            roles: user.roles,
            created_at: user.created_at,
        }
    }
}
