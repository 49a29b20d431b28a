use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sign-out record. The token itself is never stored, only its identifier;
/// `expires_at` mirrors the token's own expiry so the entry can be swept
/// once the token would have died anyway. Timestamps are unix seconds to
/// match the claim fields they mirror.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RevokedToken {
    pub jti: String,
    pub expires_at: i64,
    pub revoked_at: i64,
}

impl RevokedToken {
    pub fn new(jti: String, expires_at: i64) -> Self {
        Self {
            jti,
            expires_at,
            revoked_at: Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now.timestamp()
    }
}
