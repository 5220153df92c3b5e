use crate::models::budget::{Budget, NewBudget};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const BUDGET_COLUMNS: &str = "id, user_id, name, limit_cents, created_at";

fn map_budget(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        limit_cents: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insertion order, so status ties stay deterministic.
pub fn list_budgets(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Budget>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM budgets WHERE user_id = ? ORDER BY id",
        BUDGET_COLUMNS
    ))?;

    let budgets = stmt
        .query_map([user_id], map_budget)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(budgets)
}

pub fn get_budget(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<Option<Budget>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM budgets WHERE id = ? AND user_id = ?",
            BUDGET_COLUMNS
        ),
        [id, user_id],
        map_budget,
    )
    .optional()
}

pub fn budget_name_exists(conn: &Connection, user_id: i64, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM budgets WHERE user_id = ? AND name = ?)",
        params![user_id, name],
        |row| row.get(0),
    )
}

pub fn create_budget(conn: &Connection, user_id: i64, budget: &NewBudget) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO budgets (user_id, name, limit_cents) VALUES (?, ?, ?)",
        params![user_id, budget.name.trim(), budget.limit_cents],
    )?;
    let id = conn.last_insert_rowid();
    debug!(budget_id = id, user_id, name = %budget.name, "Created budget");
    Ok(id)
}

pub fn update_budget(
    conn: &Connection,
    user_id: i64,
    id: i64,
    budget: &NewBudget,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE budgets SET name = ?, limit_cents = ? WHERE id = ? AND user_id = ?",
        params![budget.name.trim(), budget.limit_cents, id, user_id],
    )?;
    if rows > 0 {
        debug!(budget_id = id, name = %budget.name, "Updated budget");
    }
    Ok(rows > 0)
}

pub fn delete_budget(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM budgets WHERE id = ? AND user_id = ?",
        [id, user_id],
    )?;
    if rows > 0 {
        debug!(budget_id = id, "Deleted budget");
    }
    Ok(rows > 0)
}
