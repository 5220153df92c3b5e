use crate::models::category::{Category, CategoryKind, NewCategory};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const CATEGORY_COLUMNS: &str = "id, user_id, name, kind, created_at";

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let kind_str: String = row.get(3)?;
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: CategoryKind::parse(&kind_str).unwrap_or(CategoryKind::Expense),
        created_at: row.get(4)?,
    })
}

pub fn list_categories(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories WHERE user_id = ? ORDER BY name",
        CATEGORY_COLUMNS
    ))?;

    let categories = stmt
        .query_map([user_id], map_category)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(categories)
}

pub fn get_category(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM categories WHERE id = ? AND user_id = ?",
            CATEGORY_COLUMNS
        ),
        [id, user_id],
        map_category,
    )
    .optional()
}

/// First category (by id) whose lower-cased name contains any of `needles`.
pub fn find_category_containing(
    conn: &Connection,
    user_id: i64,
    needles: &[&str],
) -> rusqlite::Result<Option<Category>> {
    let categories = list_categories(conn, user_id)?;
    Ok(categories
        .into_iter()
        .filter(|c| {
            let name = c.name.to_lowercase();
            needles.iter().any(|n| name.contains(n))
        })
        .min_by_key(|c| c.id))
}

pub fn count_categories(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE user_id = ?",
        [user_id],
        |row| row.get(0),
    )
}

pub fn create_category(
    conn: &Connection,
    user_id: i64,
    category: &NewCategory,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO categories (user_id, name, kind) VALUES (?, ?, ?)",
        params![user_id, category.name.trim(), category.kind.as_str()],
    )?;
    let id = conn.last_insert_rowid();
    debug!(category_id = id, user_id, name = %category.name, "Created category");
    Ok(id)
}

pub fn update_category(
    conn: &Connection,
    user_id: i64,
    id: i64,
    category: &NewCategory,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE categories SET name = ?, kind = ? WHERE id = ? AND user_id = ?",
        params![category.name.trim(), category.kind.as_str(), id, user_id],
    )?;
    if rows > 0 {
        debug!(category_id = id, name = %category.name, "Updated category");
    }
    Ok(rows > 0)
}

/// Transactions in the category keep existing with no category.
pub fn delete_category(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM categories WHERE id = ? AND user_id = ?",
        [id, user_id],
    )?;
    if rows > 0 {
        debug!(category_id = id, "Deleted category");
    }
    Ok(rows > 0)
}
