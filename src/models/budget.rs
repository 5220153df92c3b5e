use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A monthly spending limit, matched against category names or, failing
/// that, expense descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub limit_cents: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub limit_cents: i64,
}

impl NewBudget {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Budget name is required".into()));
        }
        if self.limit_cents < 0 {
            return Err(AppError::Validation(
                "Budget limit cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
