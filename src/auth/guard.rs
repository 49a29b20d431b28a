use std::sync::Arc;

use crate::{
    auth::{claims::Claims, jwt::JwtService},
    errors::{AppError, AppResult},
    models::domain::UserRole,
    repositories::RevokedTokenRepository,
};

/// The single chokepoint for protected operations: token validation,
/// revocation lookup, and the role decision all happen here. Handlers and
/// middleware never re-implement any of the three.
#[derive(Clone)]
pub struct AccessGuard {
    jwt: Arc<JwtService>,
    revoked_tokens: Arc<dyn RevokedTokenRepository>,
}

impl AccessGuard {
    pub fn new(jwt: Arc<JwtService>, revoked_tokens: Arc<dyn RevokedTokenRepository>) -> Self {
        Self {
            jwt,
            revoked_tokens,
        }
    }

    /// Expired, malformed and revoked tokens are indistinguishable to the
    /// caller: all fail `Unauthenticated`. A valid token missing the
    /// required role fails `Forbidden`.
    pub async fn authorize(
        &self,
        token: &str,
        required_role: Option<UserRole>,
    ) -> AppResult<Claims> {
        let claims = self.jwt.validate_token(token)?;

        if self.revoked_tokens.is_revoked(&claims.jti).await? {
            return Err(AppError::Unauthenticated(
                "Token is no longer valid".to_string(),
            ));
        }

        if let Some(role) = required_role {
            require_role(&claims, role)?;
        }

        Ok(claims)
    }

    /// `authorize` with no role requirement: any authenticated caller.
    pub async fn authenticate(&self, token: &str) -> AppResult<Claims> {
        self.authorize(token, None).await
    }
}

/// Role decision against the claims' snapshotted role set. Roles granted
/// after issuance only appear in tokens issued afterwards.
pub fn require_role(claims: &Claims, role: UserRole) -> AppResult<()> {
    if !claims.has_role(role) {
        return Err(AppError::Forbidden(format!(
            "Requires the {} role",
            role
        )));
    }
    Ok(())
}

pub fn require_self_or_admin(claims: &Claims, user_id: &str) -> AppResult<()> {
    if !claims.has_role(UserRole::Admin) && claims.sub != user_id {
        return Err(AppError::Forbidden(
            "You can only access your own account".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::domain::User;
    use crate::repositories::revoked_token_repository::MockRevokedTokenRepository;

    fn test_claims(roles: Vec<UserRole>) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            email: "user@example.com".to_string(),
            roles,
            iat: 0,
            exp: 9999999999,
            jti: "jti-1".to_string(),
        }
    }

    fn guard_with(revoked: MockRevokedTokenRepository) -> (AccessGuard, Arc<JwtService>) {
        let config = Config::test_config();
        let jwt = Arc::new(JwtService::new(&config.jwt_secret, 1));
        (AccessGuard::new(jwt.clone(), Arc::new(revoked)), jwt)
    }

    #[test]
    fn test_require_role_success() {
        let claims = test_claims(vec![UserRole::User, UserRole::Admin]);
        assert!(require_role(&claims, UserRole::Admin).is_ok());
    }

    #[test]
    fn test_require_role_failure() {
        let claims = test_claims(vec![UserRole::User]);
        let result = require_role(&claims, UserRole::Admin);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_require_self_or_admin_as_self() {
        let claims = test_claims(vec![UserRole::User]);
        assert!(require_self_or_admin(&claims, "user-1").is_ok());
    }

    #[test]
    fn test_require_self_or_admin_as_admin() {
        let claims = test_claims(vec![UserRole::Admin]);
        assert!(require_self_or_admin(&claims, "someone-else").is_ok());
    }

    #[test]
    fn test_require_self_or_admin_failure() {
        let claims = test_claims(vec![UserRole::User]);
        let result = require_self_or_admin(&claims, "someone-else");
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_authorize_valid_token() {
        let mut revoked = MockRevokedTokenRepository::new();
        revoked.expect_is_revoked().returning(|_| Ok(false));
        let (guard, jwt) = guard_with(revoked);

        let user = User::test_user("user@example.com", "hash");
        let token = jwt.issue_token(&user).unwrap();

        let claims = guard.authorize(&token, Some(UserRole::User)).await.unwrap();
        assert_eq!(claims.email, "user@example.com");
    }

    #[tokio::test]
    async fn test_authorize_revoked_token_is_unauthenticated() {
        let mut revoked = MockRevokedTokenRepository::new();
        revoked.expect_is_revoked().returning(|_| Ok(true));
        let (guard, jwt) = guard_with(revoked);

        let user = User::test_user("user@example.com", "hash");
        let token = jwt.issue_token(&user).unwrap();

        let result = guard.authenticate(&token).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_authorize_missing_role_is_forbidden() {
        let mut revoked = MockRevokedTokenRepository::new();
        revoked.expect_is_revoked().returning(|_| Ok(false));
        let (guard, jwt) = guard_with(revoked);

        let user = User::test_user("user@example.com", "hash");
        let token = jwt.issue_token(&user).unwrap();

        let result = guard.authorize(&token, Some(UserRole::Admin)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_authorize_garbage_token_skips_revocation_lookup() {
        let mut revoked = MockRevokedTokenRepository::new();
        revoked.expect_is_revoked().never();
        let (guard, _jwt) = guard_with(revoked);

        let result = guard.authenticate("not.a.token").await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }
}
