//! # rb-auth-simple
//! 
//! Argon2-based implementation of `CredentialHasher`.
//! Produces PHC strings (`$argon2id$v=19$...`) with a fresh random salt per hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rb_core::error::{AppError, Result};
use rb_core::traits::CredentialHasher;

#[derive(Default)]
pub struct Argon2CredentialHasher {
    argon: Argon2<'static>,
}

impl Argon2CredentialHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialHasher for Argon2CredentialHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("stored password hash is malformed: {}", e);
                return false;
            }
        };
        self.argon
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
