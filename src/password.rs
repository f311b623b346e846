use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};
use password_hash::{PasswordHash, SaltString};
use std::sync::Arc;

/// PasswordHasher
///
/// Defines the abstract contract for credential hashing. The trait lets tests swap
/// the real Argon2id implementation for a cheap deterministic one without touching
/// the SessionManager.
pub trait PasswordHasher: Send + Sync {
    /// Produces a fresh random salt, unique per identity.
    fn create_salt(&self) -> Result<String, String>;

    /// One-way hash of `password` under `salt`. Never reversible.
    fn hash_password(&self, password: &str, salt: &str) -> Result<String, String>;

    /// Recomputes and compares. Comparison is delegated to the underlying
    /// primitive, which is constant-time; the salt argument is accepted for
    /// interface symmetry (the PHC hash string already embeds it).
    fn verify_password(&self, hash: &str, password: &str, salt: &str) -> bool;
}

/// HasherState
///
/// The concrete type used to share the hasher across the application state.
pub type HasherState = Arc<dyn PasswordHasher>;

/// Argon2PasswordHasher
///
/// Production implementation backed by Argon2id with the crate's default
/// memory/iteration parameters. Output is a PHC string, stored verbatim on the
/// Identity row.
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn create_salt(&self) -> Result<String, String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| e.to_string())?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| e.to_string())?;
        Ok(salt.as_str().to_string())
    }

    fn hash_password(&self, password: &str, salt: &str) -> Result<String, String> {
        let salt = SaltString::from_b64(salt).map_err(|e| e.to_string())?;
        let argon2 = Argon2::default();
        let phc = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| e.to_string())?
            .to_string();
        Ok(phc)
    }

    fn verify_password(&self, hash: &str, password: &str, _salt: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            let argon2 = Argon2::default();
            argon2.verify_password(password.as_bytes(), &parsed).is_ok()
        } else {
            false
        }
    }
}
