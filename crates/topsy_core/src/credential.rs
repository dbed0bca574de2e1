//! Credential hashing collaborator.
//!
//! Raw passwords cross the core only at `create_user`/`verify_password`;
//! storage backends persist the output of a [`PasswordHasher`] instead.
//!
//! # Invariants
//! - Stored hashes are PHC strings (`$argon2id$v=19$...`) carrying their
//!   own salt and cost parameters.
//! - A malformed stored hash never verifies.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hashing failed before anything was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError(String);

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to hash password: {}", self.0)
    }
}

impl Error for CredentialError {}

/// Produces and verifies salted password hashes.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, raw_password: &str) -> Result<String, CredentialError>;
    fn verify(&self, raw_password: &str, stored_hash: &str) -> bool;
}

/// Argon2id hasher with the crate's default cost parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, raw_password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|err| CredentialError(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("event=password_verify module=credential status=error error={err}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }
}
