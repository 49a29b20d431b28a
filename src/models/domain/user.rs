use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Closed role set. Unknown names are rejected at the boundary, before any
/// store access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl UserRole {
    pub fn parse(name: &str) -> AppResult<Self> {
        match name.trim().to_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(AppError::InvalidRole(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account. `password_hash` is `None` for OAuth-provisioned
/// accounts, which disables password login until a password is set.
/// Invariant: `roles` is never empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub roles: Vec<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new_local(email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        User {
            id: Some(ObjectId::new()),
            email: email.to_string(),
            password_hash: Some(password_hash),
            roles: vec![UserRole::default()],
            github_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_github(email: &str, github_id: &str) -> Self {
        let now = Utc::now();
        User {
            id: Some(ObjectId::new()),
            email: email.to_string(),
            password_hash: None,
            roles: vec![UserRole::default()],
            github_id: Some(github_id.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn id_hex(&self) -> String {
        self.id
            .as_ref()
            .map(|oid| oid.to_hex())
            .unwrap_or_default()
    }
}

/// Emails are matched case-insensitively; the store only ever sees the
/// normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
impl User {
    pub fn test_user(email: &str, password_hash: &str) -> Self {
        User::new_local(&normalize_email(email), password_hash.to_string())
    }
}
