use std::sync::Arc;

use once_cell::sync::Lazy;
use validator::Validate;

use crate::{
    auth::{Claims, JwtService, PasswordService},
    errors::{AppError, AppResult},
    models::{
        domain::{user::normalize_email, RevokedToken, User, UserRole},
        dto::{
            request::{ChangePasswordRequest, SignInRequest, SignUpRequest},
            response::{AuthResponse, UserResponse},
        },
    },
    repositories::{RevokedTokenRepository, UserRepository},
};

// Verified against when the email lookup misses, so the unknown-email and
// wrong-password paths cost the same.
static SIGNIN_DUMMY_HASH: Lazy<String> =
    Lazy::new(|| PasswordService::new().hash("signin-timing-pad").unwrap_or_default());

pub struct UserService {
    users: Arc<dyn UserRepository>,
    revoked_tokens: Arc<dyn RevokedTokenRepository>,
    passwords: PasswordService,
    jwt: Arc<JwtService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        revoked_tokens: Arc<dyn RevokedTokenRepository>,
        passwords: PasswordService,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            revoked_tokens,
            passwords,
            jwt,
        }
    }

    pub async fn signup(&self, request: SignUpRequest) -> AppResult<UserResponse> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let password_hash = self.passwords.hash(&request.password)?;

        let user = self.users.create(User::new_local(&email, password_hash)).await?;
        log::info!("Registered new user {}", user.email);

        Ok(UserResponse::from(user))
    }

    /// Unknown email and wrong password are deliberately the same error, so
    /// a caller cannot probe which half failed.
    pub async fn signin(&self, request: SignInRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let email = normalize_email(&request.email);

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                self.passwords.verify(&request.password, &SIGNIN_DUMMY_HASH);
                return Err(AppError::InvalidCredentials);
            }
        };

        // OAuth-provisioned accounts have no usable local password until one
        // is set; they fall through to the same uniform error.
        let verified = match user.password_hash.as_deref() {
            Some(stored) => self.passwords.verify(&request.password, stored),
            None => {
                self.passwords.verify(&request.password, &SIGNIN_DUMMY_HASH);
                false
            }
        };

        if !verified {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.jwt.issue_token(&user)?;
        Ok(AuthResponse::bearer(token, user.email))
    }

    /// Pushes the token's identifier into the revocation set. The entry
    /// mirrors the token's own expiry so the sweep can drop it later.
    pub async fn signout(&self, claims: &Claims) -> AppResult<()> {
        self.revoked_tokens
            .revoke(RevokedToken::new(claims.jti.clone(), claims.exp as i64))
            .await?;
        log::info!("Signed out token for user {}", claims.sub);
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        request.validate()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))?;

        let verified = match user.password_hash.as_deref() {
            Some(stored) => self.passwords.verify(&request.old_password, stored),
            None => false,
        };
        if !verified {
            return Err(AppError::InvalidCredentials);
        }

        let new_hash = self.passwords.hash(&request.new_password)?;
        self.users.update_password_hash(user_id, &new_hash).await
    }

    /// Role names are validated before the store is touched; the grant only
    /// shows up in tokens issued afterwards.
    pub async fn add_role(&self, user_id: &str, role_name: &str) -> AppResult<()> {
        let role = UserRole::parse(role_name)?;
        self.users.add_role(user_id, role).await
    }

    pub async fn remove_role(&self, user_id: &str, role_name: &str) -> AppResult<()> {
        let role = UserRole::parse(role_name)?;
        self.users.remove_role(user_id, role).await
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<UserResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))?;

        Ok(UserResponse::from(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repositories::revoked_token_repository::MockRevokedTokenRepository;
    use crate::repositories::user_repository::MockUserRepository;

    fn service_with(
        users: MockUserRepository,
        revoked: MockRevokedTokenRepository,
    ) -> UserService {
        let config = Config::test_config();
        UserService::new(
            Arc::new(users),
            Arc::new(revoked),
            PasswordService::new(),
            Arc::new(JwtService::new(&config.jwt_secret, 1)),
        )
    }

    fn stored_user(email: &str, password: &str) -> User {
        let hash = PasswordService::new().hash(password).unwrap();
        User::new_local(email, hash)
    }

    #[tokio::test]
    async fn test_signin_success() {
        let user = stored_user("a@x.com", "Secret123");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "a@x.com")
            .returning(move |_| Ok(Some(user.clone())));

        let service = service_with(users, MockRevokedTokenRepository::new());
        let response = service
            .signin(SignInRequest {
                email: "A@X.com".to_string(),
                password: "Secret123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_signin_wrong_password_and_unknown_email_are_identical() {
        let user = stored_user("a@x.com", "Secret123");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |email| match email {
                "a@x.com" => Ok(Some(user.clone())),
                _ => Ok(None),
            });

        let service = service_with(users, MockRevokedTokenRepository::new());

        let wrong_password = service
            .signin(SignInRequest {
                email: "a@x.com".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        let unknown_email = service
            .signin(SignInRequest {
                email: "nobody@x.com".to_string(),
                password: "Secret123".to_string(),
            })
            .await;

        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_signin_rejected_for_oauth_only_account() {
        let user = User::new_github("a@x.com", "gh-1");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = service_with(users, MockRevokedTokenRepository::new());
        let result = service
            .signin(SignInRequest {
                email: "a@x.com".to_string(),
                password: "anything-at-all".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_signout_revokes_token_id() {
        let mut revoked = MockRevokedTokenRepository::new();
        revoked
            .expect_revoke()
            .withf(|entry| entry.jti == "jti-1" && entry.expires_at == 12345)
            .returning(|_| Ok(()));

        let service = service_with(MockUserRepository::new(), revoked);
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "a@x.com".to_string(),
            roles: vec![UserRole::User],
            iat: 0,
            exp: 12345,
            jti: "jti-1".to_string(),
        };

        service.signout(&claims).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_role_rejects_unknown_name_before_store() {
        // No expectations on the repository: the store must not be touched.
        let service = service_with(MockUserRepository::new(), MockRevokedTokenRepository::new());

        let result = service.add_role("user-1", "SUPERUSER").await;
        assert!(matches!(result, Err(AppError::InvalidRole(_))));
    }

    #[tokio::test]
    async fn test_change_password_verifies_old_password() {
        let user = stored_user("a@x.com", "Secret123");
        let user_id = user.id_hex();
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update_password_hash().never();

        let service = service_with(users, MockRevokedTokenRepository::new());
        let result = service
            .change_password(
                &user_id,
                ChangePasswordRequest {
                    old_password: "not-the-old-one".to_string(),
                    new_password: "NewSecret456".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }
}
