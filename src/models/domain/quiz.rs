use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quiz CRUD lives outside this service; the auth core only needs enough of
/// the record to answer "does this resource exist" behind the guard.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub name: String,
    pub created_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(name: &str, created_by_user_id: &str) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_by_user_id: created_by_user_id.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}
