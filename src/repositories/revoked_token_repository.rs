use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::RevokedToken,
};

/// The revocation set. Entries are insert-only and age out once the token
/// they shadow would have expired anyway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RevokedTokenRepository: Send + Sync {
    /// Idempotent: revoking an already-revoked token id is a no-op success.
    async fn revoke(&self, entry: RevokedToken) -> AppResult<()>;
    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
    /// Drops entries whose expiry has passed. Never removes an entry early.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoRevokedTokenRepository {
    collection: Collection<RevokedToken>,
}

impl MongoRevokedTokenRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("revoked_tokens");
        Self { collection }
    }
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl RevokedTokenRepository for MongoRevokedTokenRepository {
    async fn revoke(&self, entry: RevokedToken) -> AppResult<()> {
        match self.collection.insert_one(&entry).await {
            Ok(_) => Ok(()),
            // The unique jti index makes double sign-out a no-op
            Err(err) if is_duplicate_key_error(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let entry = self.collection.find_one(doc! { "jti": jti }).await?;
        Ok(entry.is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "expires_at": { "$lt": now.timestamp() } })
            .await?;

        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let jti_options = IndexOptions::builder().unique(true).build();
        let jti_model = IndexModel::builder()
            .keys(doc! { "jti": 1 })
            .options(jti_options)
            .build();
        self.collection.create_index(jti_model).await?;
        log::info!("Created unique index on revoked_tokens.jti");

        let expires_at_model = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .build();
        self.collection.create_index(expires_at_model).await?;
        log::info!("Created index on revoked_tokens.expires_at");

        Ok(())
    }
}
