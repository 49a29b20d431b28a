// Shared between the integration suites; each binary uses a subset.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::RwLock;

use quizcraft_server::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{Quiz, RevokedToken, User, UserRole},
    repositories::{QuizRepository, RevokedTokenRepository, UserRepository},
};

pub fn test_config() -> Config {
    Config {
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "quizcraft-test".to_string(),
        gh_client_id: "id string".to_string(),
        gh_client_secret: SecretString::from("secret string".to_string()),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 8080,
        jwt_secret: SecretString::from("integration_test_jwt_secret".to_string()),
        jwt_expiration_hours: 1,
        oauth_timeout_secs: 1,
        token_sweep_interval_secs: 60,
    }
}

pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateIdentity(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }

        if let Some(github_id) = &user.github_id {
            let duplicate = users
                .values()
                .any(|u| u.github_id.as_deref() == Some(github_id.as_str()));
            if duplicate {
                return Err(AppError::DuplicateIdentity(format!(
                    "github_id '{}' is already registered",
                    github_id
                )));
            }
        }

        users.insert(user.id_hex(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_github_id(&self, github_id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.github_id.as_deref() == Some(github_id))
            .cloned())
    }

    async fn find_or_create_by_github_id(&self, user: User) -> AppResult<User> {
        let github_id = user.github_id.clone().ok_or_else(|| {
            AppError::ValidationError("User must have a github_id for provisioning".to_string())
        })?;

        // Single write lock covers lookup and insert, the in-memory stand-in
        // for the store's atomic upsert.
        let mut users = self.users.write().await;

        if let Some(existing) = users
            .values()
            .find(|u| u.github_id.as_deref() == Some(github_id.as_str()))
        {
            return Ok(existing.clone());
        }

        users.insert(user.id_hex(), user.clone());
        Ok(user)
    }

    async fn add_role(&self, id: &str, role: UserRole) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))?;

        if !user.roles.contains(&role) {
            user.roles.push(role);
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_role(&self, id: &str, role: UserRole) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))?;

        if !user.roles.contains(&role) {
            return Ok(());
        }

        if user.roles.len() <= 1 {
            return Err(AppError::InvariantViolation(
                "An identity must retain at least one role".to_string(),
            ));
        }

        user.roles.retain(|r| *r != role);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password_hash(&self, id: &str, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))?;

        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct InMemoryRevokedTokenRepository {
    entries: Arc<RwLock<HashMap<String, RevokedToken>>>,
}

impl InMemoryRevokedTokenRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl RevokedTokenRepository for InMemoryRevokedTokenRepository {
    async fn revoke(&self, entry: RevokedToken) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.entry(entry.jti.clone()).or_insert(entry);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let entries = self.entries.read().await;
        Ok(entries.contains_key(jti))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok((before - entries.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self {
            quizzes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, quiz: Quiz) {
        let mut quizzes = self.quizzes.write().await;
        quizzes.insert(quiz.id.clone(), quiz);
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.get(id).cloned())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub users: Arc<InMemoryUserRepository>,
    pub revoked_tokens: Arc<InMemoryRevokedTokenRepository>,
    pub quizzes: Arc<InMemoryQuizRepository>,
}

pub fn test_context() -> TestContext {
    let users = Arc::new(InMemoryUserRepository::new());
    let revoked_tokens = Arc::new(InMemoryRevokedTokenRepository::new());
    let quizzes = Arc::new(InMemoryQuizRepository::new());

    let state = AppState::from_parts(
        test_config(),
        users.clone(),
        revoked_tokens.clone(),
        quizzes.clone(),
    )
    .expect("test state should build");

    TestContext {
        state: Arc::new(state),
        users,
        revoked_tokens,
        quizzes,
    }
}
