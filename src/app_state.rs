use std::sync::Arc;

use crate::{
    auth::{AccessGuard, JwtService, PasswordService},
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuizRepository, MongoRevokedTokenRepository, MongoUserRepository, QuizRepository,
        RevokedTokenRepository, UserRepository,
    },
    services::{GithubOAuthService, QuizService, UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub oauth_service: Arc<GithubOAuthService>,
    pub quiz_service: Arc<QuizService>,
    pub access_guard: AccessGuard,
    pub revoked_tokens: Arc<dyn RevokedTokenRepository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let users = Arc::new(MongoUserRepository::new(&db));
        users.ensure_indexes().await?;

        let revoked_tokens = Arc::new(MongoRevokedTokenRepository::new(&db));
        revoked_tokens.ensure_indexes().await?;

        let quizzes = Arc::new(MongoQuizRepository::new(&db));
        quizzes.ensure_indexes().await?;

        Self::from_parts(config, users, revoked_tokens, quizzes)
    }

    /// Wiring without a database connection; the integration suites hand in
    /// in-memory repositories here.
    pub fn from_parts(
        config: Config,
        users: Arc<dyn UserRepository>,
        revoked_tokens: Arc<dyn RevokedTokenRepository>,
        quizzes: Arc<dyn QuizRepository>,
    ) -> AppResult<Self> {
        let jwt = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));
        let passwords = PasswordService::new();

        let user_service = Arc::new(UserService::new(
            users.clone(),
            revoked_tokens.clone(),
            passwords,
            jwt.clone(),
        ));
        let oauth_service = Arc::new(GithubOAuthService::new(&config, users, jwt.clone())?);
        let quiz_service = Arc::new(QuizService::new(quizzes));
        let access_guard = AccessGuard::new(jwt, revoked_tokens.clone());

        Ok(Self {
            user_service,
            oauth_service,
            quiz_service,
            access_guard,
            revoked_tokens,
            config: Arc::new(config),
        })
    }
}
