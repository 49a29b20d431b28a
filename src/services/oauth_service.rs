use std::sync::Arc;
use std::time::Duration;

use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::JwtService,
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{user::normalize_email, User},
        dto::response::AuthResponse,
    },
    repositories::UserRepository,
};

const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

// Transport failures on the exchange are retried once; everything past that
// surfaces as ProviderUnavailable. Nothing else in the login path retries.
const TOKEN_EXCHANGE_ATTEMPTS: u32 = 2;

/// Bridges a GitHub login into the local token model: verify the
/// authorization code with GitHub, find-or-provision a local identity for
/// the GitHub subject, then issue a session token exactly as password login
/// does.
pub struct GithubOAuthService {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl GithubOAuthService {
    pub fn new(
        config: &Config,
        users: Arc<dyn UserRepository>,
        jwt: Arc<JwtService>,
    ) -> AppResult<Self> {
        // Every provider call is bounded by this timeout; a slow provider
        // fails the login attempt, it never hangs it.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.oauth_timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            client_id: config.gh_client_id.clone(),
            client_secret: config.gh_client_secret.clone(),
            users,
            jwt,
        })
    }

    pub async fn complete_login(&self, code: &str, redirect_uri: &str) -> AppResult<AuthResponse> {
        let access_token = self.exchange_code(code, redirect_uri).await?;

        let gh_client = Octocrab::builder()
            .user_access_token(access_token)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to build GitHub client: {}", e))
            })?;

        let gh_user = gh_client.current().user().await.map_err(|e| {
            AppError::ProviderUnavailable(format!("Failed to fetch GitHub user: {}", e))
        })?;

        let github_id = gh_user.id.to_string();
        let email = gh_user
            .email
            .clone()
            .unwrap_or_else(|| format!("{}@users.noreply.github.com", gh_user.login));

        self.login_with_external_identity(&email, &github_id).await
    }

    /// The local half of the login, past provider verification. The upsert
    /// is atomic on the github_id key, so concurrent first-time logins for
    /// one subject bind to a single stored identity; a crash before token
    /// issuance leaves that identity usable on retry, never half-written.
    pub async fn login_with_external_identity(
        &self,
        email: &str,
        github_id: &str,
    ) -> AppResult<AuthResponse> {
        let candidate = User::new_github(&normalize_email(email), github_id);
        let user = self.users.find_or_create_by_github_id(candidate).await?;

        log::info!("GitHub login for {} (github_id {})", user.email, github_id);

        let token = self.jwt.issue_token(&user)?;
        Ok(AuthResponse::bearer(token, user.email))
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AppResult<String> {
        let mut last_transport_error = None;

        for attempt in 1..=TOKEN_EXCHANGE_ATTEMPTS {
            let response = self
                .http
                .post(GITHUB_TOKEN_URL)
                .header("accept", "application/json")
                .form(&[
                    ("code", code),
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.expose_secret()),
                    ("redirect_uri", redirect_uri),
                ])
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(err) if err.is_timeout() || err.is_connect() => {
                    log::warn!("GitHub token exchange attempt {} failed: {}", attempt, err);
                    last_transport_error = Some(err);
                    continue;
                }
                Err(err) => {
                    return Err(AppError::ProviderUnavailable(format!(
                        "Failed to reach GitHub: {}",
                        err
                    )))
                }
            };

            let payload = response.json::<serde_json::Value>().await.map_err(|e| {
                AppError::ProviderUnavailable(format!("Malformed token response: {}", e))
            })?;

            if let Some(error) = payload.get("error").and_then(|v| v.as_str()) {
                let description = payload
                    .get("error_description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown error");
                return Err(AppError::ProviderUnavailable(format!(
                    "GitHub rejected the login: {} - {}",
                    error, description
                )));
            }

            return payload
                .get("access_token")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::ProviderUnavailable(
                        "No access_token in GitHub response".to_string(),
                    )
                });
        }

        Err(AppError::ProviderUnavailable(format!(
            "GitHub token exchange failed after {} attempts: {}",
            TOKEN_EXCHANGE_ATTEMPTS,
            last_transport_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "timeout".to_string())
        )))
    }
}
