/// Password hashing
///
/// Argon2id with per-password random salt and the library's default cost
/// parameters. Hashing happens exactly once per password value, at
/// registration and on password change; no other update path touches the
/// hash, so an already-hashed value can never be hashed again.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, SaltString},
    Argon2, PasswordVerifier,
};

use crate::error::{AppError, AppResult};

pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a plaintext password into a PHC-format string
    pub fn hash(plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// Returns Ok(false) for a wrong password; Err only when the stored
    /// hash itself is malformed.
    pub fn verify(plaintext: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Malformed password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }
}
