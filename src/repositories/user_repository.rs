use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, to_document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{User, UserRole},
};

// A role CAS can lose against a concurrent mutation of the same identity;
// retried a couple of times before giving up.
const ROLE_UPDATE_ATTEMPTS: usize = 3;

/// The credential store. Uniqueness (email, github_id) is enforced by the
/// store itself, never by check-then-act in callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DuplicateIdentity` when the email is already registered.
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_by_github_id(&self, github_id: &str) -> AppResult<Option<User>>;
    /// Atomic insert-or-fetch on the github_id key: concurrent first-time
    /// logins for one external subject resolve to the same stored identity.
    async fn find_or_create_by_github_id(&self, user: User) -> AppResult<User>;
    /// Idempotent: adding a role the identity already holds is a no-op.
    async fn add_role(&self, id: &str, role: UserRole) -> AppResult<()>;
    /// Idempotent for absent roles; removing the last remaining role fails
    /// with `InvariantViolation` and leaves the set unchanged.
    async fn remove_role(&self, id: &str, role: UserRole) -> AppResult<()>;
    async fn update_password_hash(&self, id: &str, password_hash: &str) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("users");
        Self { collection }
    }
}

fn parse_object_id(id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound(format!("User with id '{}' not found", id)))
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key_error(&err) => Err(AppError::DuplicateIdentity(
                format!("Email '{}' is already registered", user.email),
            )),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        let user = self.collection.find_one(doc! { "_id": oid }).await?;
        Ok(user)
    }

    async fn find_by_github_id(&self, github_id: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "github_id": github_id })
            .await?;
        Ok(user)
    }

    async fn find_or_create_by_github_id(&self, user: User) -> AppResult<User> {
        let github_id = user.github_id.clone().ok_or_else(|| {
            AppError::ValidationError("User must have a github_id for provisioning".to_string())
        })?;

        // github_id must come from the filter alone; repeating it in
        // $setOnInsert is an update conflict on upsert.
        let mut on_insert = to_document(&user)?;
        on_insert.remove("github_id");

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let stored = self
            .collection
            .find_one_and_update(
                doc! { "github_id": &github_id },
                doc! { "$setOnInsert": on_insert },
            )
            .with_options(options)
            .await?;

        stored.ok_or_else(|| {
            AppError::DatabaseError("Upsert returned no document".to_string())
        })
    }

    async fn add_role(&self, id: &str, role: UserRole) -> AppResult<()> {
        let oid = parse_object_id(id)?;
        let role_bson = to_bson(&role)?;

        let result = self
            .collection
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$addToSet": { "roles": role_bson },
                    "$set": { "updated_at": to_bson(&Utc::now())? },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User with id '{}' not found", id)));
        }

        Ok(())
    }

    async fn remove_role(&self, id: &str, role: UserRole) -> AppResult<()> {
        let oid = parse_object_id(id)?;
        let role_bson = to_bson(&role)?;

        for _ in 0..ROLE_UPDATE_ATTEMPTS {
            // The filter demands the role be present AND at least one other
            // role remain, so the last role can never be pulled, even under
            // concurrent removals.
            let result = self
                .collection
                .update_one(
                    doc! {
                        "_id": oid,
                        "roles": role_bson.clone(),
                        "roles.1": { "$exists": true },
                    },
                    doc! {
                        "$pull": { "roles": role_bson.clone() },
                        "$set": { "updated_at": to_bson(&Utc::now())? },
                    },
                )
                .await?;

            if result.matched_count > 0 {
                return Ok(());
            }

            let user = self
                .collection
                .find_one(doc! { "_id": oid })
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))?;

            if !user.has_role(role) {
                // Absent role: removal is a no-op success
                return Ok(());
            }

            if user.roles.len() <= 1 {
                return Err(AppError::InvariantViolation(
                    "An identity must retain at least one role".to_string(),
                ));
            }

            // Role present with company, yet the update missed: a concurrent
            // mutation won the race. Try again.
        }

        Err(AppError::DatabaseError(
            "Conflicting concurrent role updates".to_string(),
        ))
    }

    async fn update_password_hash(&self, id: &str, password_hash: &str) -> AppResult<()> {
        let oid = parse_object_id(id)?;

        let result = self
            .collection
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$set": {
                        "password_hash": password_hash,
                        "updated_at": to_bson(&Utc::now())?,
                    },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User with id '{}' not found", id)));
        }

        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let email_options = IndexOptions::builder().unique(true).build();
        let email_model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(email_options)
            .build();
        self.collection.create_index(email_model).await?;
        log::info!("Created unique index on users.email");

        // Sparse: only OAuth-provisioned users carry a github_id
        let github_options = IndexOptions::builder().unique(true).sparse(true).build();
        let github_model = IndexModel::builder()
            .keys(doc! { "github_id": 1 })
            .options(github_options)
            .build();
        self.collection.create_index(github_model).await?;
        log::info!("Created unique sparse index on users.github_id");

        Ok(())
    }
}
