use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Registration input; the plain password never reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub const MIN_PASSWORD_LEN: usize = 6;

impl NewUser {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".into()));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(AppError::Validation(format!("Invalid email: {}", email))),
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            name: "Ana".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(new_user("ana@example.com", "secret1").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_email_and_short_password() {
        assert!(new_user("ana.example.com", "secret1").validate().is_err());
        assert!(new_user("@example.com", "secret1").validate().is_err());
        assert!(new_user("ana@example.com", "123").validate().is_err());
    }
}
