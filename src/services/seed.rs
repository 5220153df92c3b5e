//! Starter data for new users.

use rusqlite::Connection;
use tracing::info;

use crate::db::queries::{budgets, categories};
use crate::error::AppResult;
use crate::models::{NewBudget, NewCategory};

pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Food",
    "Transport",
    "Housing",
    "Leisure",
    "Health",
    "Education",
    "Clothing",
    "Services",
    "Other",
];

/// Name and monthly limit in cents.
pub const DEFAULT_BUDGETS: [(&str, i64); 5] = [
    ("Food", 80_000),
    ("Transport", 30_000),
    ("Leisure", 20_000),
    ("Subscriptions", 10_000),
    ("Health", 15_000),
];

/// Inserts the default expense categories when the user has none. Returns
/// how many were created.
pub fn ensure_default_categories(conn: &Connection, user_id: i64) -> AppResult<usize> {
    if categories::count_categories(conn, user_id)? > 0 {
        return Ok(0);
    }
    for name in DEFAULT_CATEGORIES {
        categories::create_category(conn, user_id, &NewCategory::expense(name))?;
    }
    info!(user_id, count = DEFAULT_CATEGORIES.len(), "Seeded default categories");
    Ok(DEFAULT_CATEGORIES.len())
}

/// Adds each default budget whose name the user does not have yet.
pub fn ensure_default_budgets(conn: &Connection, user_id: i64) -> AppResult<usize> {
    let mut created = 0;
    for (name, limit_cents) in DEFAULT_BUDGETS {
        if budgets::budget_name_exists(conn, user_id, name)? {
            continue;
        }
        let budget = NewBudget {
            name: name.to_string(),
            limit_cents,
        };
        budgets::create_budget(conn, user_id, &budget)?;
        created += 1;
    }
    if created > 0 {
        info!(user_id, count = created, "Seeded default budgets");
    }
    Ok(created)
}
