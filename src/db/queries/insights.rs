use crate::models::insight::Insight;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const INSIGHT_COLUMNS: &str = "id, user_id, title, body, generated_on, generated_at";

fn map_insight(row: &Row<'_>) -> rusqlite::Result<Insight> {
    Ok(Insight {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        generated_on: row.get(4)?,
        generated_at: row.get(5)?,
    })
}

/// The first insight stored for `day`, if any.
pub fn insight_for_day(
    conn: &Connection,
    user_id: i64,
    day: NaiveDate,
) -> rusqlite::Result<Option<Insight>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM insights WHERE user_id = ? AND generated_on = ? ORDER BY id LIMIT 1",
            INSIGHT_COLUMNS
        ),
        params![user_id, day],
        map_insight,
    )
    .optional()
}

pub fn latest_insight(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Insight>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM insights WHERE user_id = ?
             ORDER BY generated_on DESC, id DESC LIMIT 1",
            INSIGHT_COLUMNS
        ),
        [user_id],
        map_insight,
    )
    .optional()
}

pub fn list_insights(conn: &Connection, user_id: i64, limit: i64) -> rusqlite::Result<Vec<Insight>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM insights WHERE user_id = ?
         ORDER BY generated_on DESC, id DESC LIMIT ?",
        INSIGHT_COLUMNS
    ))?;

    let insights = stmt
        .query_map([user_id, limit], map_insight)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(insights)
}

pub fn create_insight(
    conn: &Connection,
    user_id: i64,
    title: &str,
    body: &str,
    day: NaiveDate,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO insights (user_id, title, body, generated_on) VALUES (?, ?, ?, ?)",
        params![user_id, title, body, day],
    )?;
    let id = conn.last_insert_rowid();
    debug!(insight_id = id, user_id, "Saved insight");
    Ok(id)
}
