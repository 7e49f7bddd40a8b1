//! Argon2id password hashing

use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::HabitError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash with a fresh random salt. Returns a PHC string (`$argon2id$...`).
pub fn hash_password(password: &str) -> Result<String, HabitError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| HabitError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only if the stored hash is unusable
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, HabitError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| HabitError::Auth(format!("Stored password hash is malformed: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(HabitError::Auth(format!("Password verification failed: {e}"))),
    }
}
