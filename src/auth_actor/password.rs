use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Password hashing failed: {0}")]
pub struct PasswordError(String);

/// Argon2id hashing for stored passwords.
///
/// Hashes are PHC strings, so each one carries its own salt and cost
/// parameters and keeps verifying after the configured costs change.
#[derive(Clone)]
pub struct Passwords {
    argon2: Argon2<'static>,
    /// Checked against when the username is unknown, so a miss costs as
    /// much as a wrong password.
    decoy: String,
}

impl Passwords {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| PasswordError(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy = hash_with(&argon2, "decoy password")?;
        Ok(Self { argon2, decoy })
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.argon2, password)
    }

    pub fn verify(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Does the work of a verification for a username that does not exist.
    pub fn simulate_verify(&self, password: &str) {
        let _ = self.verify(&self.decoy, password);
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}
