/// PIN hashing and verification using Argon2id
use crate::error::{AccountError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hashing seam. Implementations are CPU-bound and synchronous; callers move
/// them onto the blocking pool.
pub trait SecretHasher: Send + Sync {
    /// Encode a secret for storage
    fn hash(&self, secret: &str) -> Result<String>;

    /// Check `secret` against a stored encoding. A wrong secret is `Ok(false)`;
    /// a malformed encoding is an error.
    fn verify(&self, secret: &str, encoded: &str) -> Result<bool>;
}

/// Argon2id (default parameters) with a random 16-byte salt per hash
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AccountError::Internal(format!("PIN hashing failed: {}", e)))?
            .to_string();

        Ok(hash)
    }

    fn verify(&self, secret: &str, encoded: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(encoded)
            .map_err(|e| AccountError::Internal(format!("Invalid PIN hash format: {}", e)))?;

        match Argon2::default().verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AccountError::Internal(format!(
                "PIN verification failed: {}",
                e
            ))),
        }
    }
}
