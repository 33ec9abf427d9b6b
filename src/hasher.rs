//! Slow, salted one-way hashing for credential secrets.
//!
//! Token secrets (and passwords, elsewhere in the application) are stored
//! only as Argon2id hashes. A fresh salt is drawn per call, so equal
//! inputs produce different hashes at rest.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AuthError;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    /// Secure defaults for production (Argon2id RFC recommendations).
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashParams {
    /// Lowest-cost parameters accepted by the algorithm.
    ///
    /// For tests and tooling only; offers no meaningful resistance to
    /// offline cracking.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::crypto(format!("create argon2 params: {e}")))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes and verifies credential secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretHasher {
    params: HashParams,
}

impl SecretHasher {
    /// Creates a hasher with the default production parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hasher with explicit cost parameters.
    pub fn with_params(params: HashParams) -> Self {
        Self { params }
    }

    /// Hashes `input` with a freshly generated salt.
    ///
    /// Returns a PHC-format string carrying the salt and parameters.
    pub fn hash(&self, input: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.params.to_argon2()?;

        let hash = argon2
            .hash_password(input.as_bytes(), &salt)
            .map_err(|e| AuthError::crypto(format!("hash secret: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies `input` against a stored hash.
    ///
    /// Verification uses the parameters embedded in the hash itself, so a
    /// hasher built with any parameters can check any stored hash.
    pub fn verify(&self, input: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| AuthError::crypto(format!("parse hash: {e}")))?;

        Ok(Argon2::default()
            .verify_password(input.as_bytes(), &parsed)
            .is_ok())
    }
}
