use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::user::{User, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub email: String,
    pub roles: Vec<UserRole>, // Role set snapshot at issuance time
    pub exp: usize,           // Expiration time (as UTC timestamp)
    pub iat: usize,           // Issued at (as UTC timestamp)
    pub jti: String,          // Unique token id, fresh per issuance
}

impl Claims {
    /// Snapshots the user's current role set. Role changes after issuance do
    /// not affect tokens already in flight; callers re-authenticate to pick
    /// them up.
    pub fn new(user: &User, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        // ObjectId hex as subject when available, fallback to email
        let subject = user
            .id
            .as_ref()
            .map(|oid| oid.to_hex())
            .unwrap_or_else(|| user.email.clone());

        Self {
            sub: subject,
            email: user.email.clone(),
            roles: user.roles.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}
