//! # Authentication Module
//!
//! Password hashing and verification for user accounts, plus the random
//! tokens used for sessions and CSRF protection.
//!
//! Passwords are hashed with Argon2 and stored in PHC string format.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use eyre::{eyre, Result};
use rand::{distributions::Alphanumeric, Rng};

/// Length of session and CSRF tokens, in characters.
pub const TOKEN_LENGTH: usize = 48;

/// Hashes a password using the Argon2 algorithm
///
/// A fresh random salt is generated for every call, so hashing the same
/// password twice yields different strings.
///
/// # Example
///
/// ```rust
/// use medportal_api::middleware::auth::hash_password;
///
/// let hashed = hash_password("user_password").unwrap();
/// assert!(hashed.starts_with("$argon2"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    // Generate a fresh, random salt
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a stored PHC hash.
///
/// Returns `Ok(false)` for a wrong password and `Err` only when the stored
/// hash itself cannot be parsed.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| eyre!("Invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generates a random alphanumeric token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Compares two tokens without short-circuiting on the first differing byte.
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len()
        && expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
