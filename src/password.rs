//! Password hashing and verification.
//!
//! Argon2id with per-password random salts. Digests are PHC strings, opaque
//! to every other module. Both operations are CPU-bound; callers on the
//! async runtime go through [`crate::service::AuthService`], which moves
//! them onto the blocking thread pool.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Hash a plaintext password into a PHC-format digest.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(PasswordError)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored digest.
/// A malformed digest verifies as false rather than erroring.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Error hashing a password.
#[derive(Debug)]
pub struct PasswordError(argon2::password_hash::Error);

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to hash password: {}", self.0)
    }
}

impl std::error::Error for PasswordError {}
