use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand::RngCore;

use crate::errors::{AppError, AppResult};

const SALT_LEN: usize = 16;

/// Argon2id hashing and verification. Stateless; safe to clone into every
/// service that needs it.
#[derive(Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        // Default params are Argon2id with the OWASP-recommended 19 MiB /
        // t=2 / p=1 cost.
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn hash(&self, plaintext: &str) -> AppResult<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::InternalError(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(hash)
    }

    /// Verification never errors: a malformed stored hash simply does not
    /// verify.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
