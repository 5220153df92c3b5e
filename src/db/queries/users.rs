use crate::models::user::User;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)",
        params![name, email, password_hash],
    )?;
    let id = conn.last_insert_rowid();
    info!(user_id = id, "Registered user");
    Ok(id)
}

pub fn get_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
        [id],
        map_user,
    )
    .optional()
}

/// Email lookup is case-insensitive (the column is `COLLATE NOCASE`).
pub fn get_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
        [email],
        map_user,
    )
    .optional()
}

pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)",
        [email],
        |row| row.get(0),
    )
}

pub fn list_user_ids(conn: &Connection) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Removes the user and, through foreign-key cascades, everything they own.
pub fn delete_user(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?", [id])?;
    if rows > 0 {
        warn!(user_id = id, "Deleted user and all owned data");
    }
    Ok(rows > 0)
}
