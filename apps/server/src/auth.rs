//! Password hashing for back-office users.
//!
//! Plain-text passwords never leave the request that submitted them; the
//! store only ever sees the argon2 PHC string.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};

use crate::error::ApiError;

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}
