//! Password hashing utilities with tuned Argon2 parameters
//!
//! Uses Argon2id with OWASP-recommended parameters. Every hash gets a fresh
//! random salt; the PHC string output embeds salt and parameters, so
//! verification works across parameter changes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::ApiError;

/// (memory KiB, iterations, lanes)
#[cfg(not(test))]
const COST: (u32, u32, u32) = (64 * 1024, 3, 4);
// Cheap parameters for tests
#[cfg(test)]
const COST: (u32, u32, u32) = (8, 1, 1);

/// Get a configured Argon2 hasher with production-ready parameters.
///
/// - Algorithm: Argon2id
/// - Memory: 64MB (64 * 1024 KB)
/// - Iterations: 3
/// - Parallelism: 4
pub fn get_argon2<'a>() -> Argon2<'a> {
    let (memory, iterations, lanes) = COST;
    let params = Params::new(memory, iterations, lanes, None).unwrap_or_else(|_| {
        tracing::warn!("Failed to create custom Argon2 params, using defaults");
        Params::default()
    });

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(get_argon2().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Constant-time check of a candidate against a stored PHC hash.
/// An unparsable stored hash never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => get_argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Failed to parse password hash: {:?}", e);
            false
        }
    }
}

/// `hash_password` on the blocking pool
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {:?}", e);
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!("Password hashing failed: {:?}", e);
            ApiError::Internal
        })
}

/// `verify_password` on the blocking pool
pub async fn verify_password_blocking(password: String, password_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {:?}", e);
            ApiError::Internal
        })
}
