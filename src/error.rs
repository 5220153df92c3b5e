use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Store-level failures the caller may retry (the scheduler shortens its
    /// interval for these; request callers ask the user to try again).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Pool(_))
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        AppError::NotFound(format!("{} {} not found", entity, id))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let db = AppError::Database(rusqlite::Error::QueryReturnedNoRows);
        assert!(db.is_transient());
        assert!(!AppError::Validation("name".into()).is_transient());
        assert!(!AppError::not_found("Account", 3).is_transient());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            AppError::not_found("Subscription", 7).to_string(),
            "Not found: Subscription 7 not found"
        );
    }
}
