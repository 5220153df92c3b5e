use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithUsage {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTag {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: None,
            description: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Tag name is required".into()));
        }
        if name.chars().count() > 30 {
            return Err(AppError::Validation(
                "Tag name must be at most 30 characters".into(),
            ));
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(AppError::Validation(
                    "Color must be in the #RRGGBB format".into(),
                ));
            }
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 100 {
                return Err(AppError::Validation(
                    "Tag description must be at most 100 characters".into(),
                ));
            }
        }
        Ok(())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#FF5733"));
        assert!(is_hex_color("#00aa00"));
        assert!(!is_hex_color("FF5733"));
        assert!(!is_hex_color("#FF573"));
        assert!(!is_hex_color("#GG5733"));
    }

    #[test]
    fn test_validate_rejects_long_name() {
        let tag = NewTag::named(&"x".repeat(31));
        assert!(tag.validate().is_err());
        assert!(NewTag::named("travel").validate().is_ok());
    }
}
