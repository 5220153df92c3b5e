//! Password hashing and user registration/login.
//!
//! Passwords are stored as Argon2 PHC strings. Session handling belongs to
//! the caller; this module only answers "who is this".

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::db::queries::users;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against an Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        error!("Invalid password hash format in users table");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Creates a user after validating the input. Emails are unique regardless
/// of case.
pub fn register_user(conn: &Connection, new_user: &NewUser) -> AppResult<i64> {
    new_user.validate()?;
    let email = new_user.email.trim();
    if users::email_exists(conn, email)? {
        return Err(AppError::Validation(format!(
            "Email {} is already registered",
            email
        )));
    }

    let hash = hash_password(&new_user.password)?;
    let id = users::create_user(conn, new_user.name.trim(), email, &hash)?;
    Ok(id)
}

/// Returns the user when the credentials match, `None` otherwise.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> AppResult<Option<User>> {
    let Some(user) = users::get_user_by_email(conn, email.trim())? else {
        debug!("Login attempt for unknown email");
        return Ok(None);
    };

    if verify_password(password, &user.password_hash) {
        info!(user_id = user.id, "User authenticated");
        Ok(Some(user))
    } else {
        debug!(user_id = user.id, "Password mismatch");
        Ok(None)
    }
}
