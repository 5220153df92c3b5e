use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKind {
    Expense,
    Budget,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Expense => "Expense",
            CategoryKind::Budget => "Budget",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Expense" => Some(CategoryKind::Expense),
            "Budget" => Some(CategoryKind::Budget),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: CategoryKind,
}

fn default_kind() -> CategoryKind {
    CategoryKind::Expense
}

impl NewCategory {
    pub fn expense(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: CategoryKind::Expense,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is required".into()));
        }
        if name.chars().count() > 50 {
            return Err(AppError::Validation(
                "Category name must be at most 50 characters".into(),
            ));
        }
        Ok(())
    }
}
