use crate::models::tag::{NewTag, Tag, TagWithUsage};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

/// Tag columns qualified with the `t` alias, in `map_tag` order.
pub(crate) const TAG_COLUMNS_T: &str = "t.id, t.user_id, t.name, t.color, t.description, t.created_at";

/// Maps six tag columns starting at `offset`.
pub(crate) fn map_tag(row: &Row<'_>, offset: usize) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        color: row.get(offset + 3)?,
        description: row.get(offset + 4)?,
        created_at: row.get(offset + 5)?,
    })
}

pub fn list_tags(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tags t WHERE t.user_id = ? ORDER BY t.name",
        TAG_COLUMNS_T
    ))?;

    let tags = stmt
        .query_map([user_id], |row| map_tag(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tags)
}

pub fn list_tags_with_usage(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<TagWithUsage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, COUNT(tt.transaction_id) AS usage_count
         FROM tags t
         LEFT JOIN transaction_tags tt ON t.id = tt.tag_id
         WHERE t.user_id = ?
         GROUP BY t.id
         ORDER BY t.name",
        TAG_COLUMNS_T
    ))?;

    let tags = stmt
        .query_map([user_id], |row| {
            Ok(TagWithUsage {
                tag: map_tag(row, 0)?,
                usage_count: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tags)
}

pub fn search_tags(conn: &Connection, user_id: i64, query: &str) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tags t
         WHERE t.user_id = ? AND t.name LIKE ?
         ORDER BY t.name
         LIMIT 10",
        TAG_COLUMNS_T
    ))?;

    let tags = stmt
        .query_map(params![user_id, format!("%{}%", query)], |row| map_tag(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tags)
}

pub fn get_tag(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tags t WHERE t.id = ? AND t.user_id = ?",
            TAG_COLUMNS_T
        ),
        [id, user_id],
        |row| map_tag(row, 0),
    )
    .optional()
}

pub fn get_tag_by_name(conn: &Connection, user_id: i64, name: &str) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tags t WHERE t.user_id = ? AND t.name = ?",
            TAG_COLUMNS_T
        ),
        params![user_id, name],
        |row| map_tag(row, 0),
    )
    .optional()
}

pub fn create_tag(conn: &Connection, user_id: i64, tag: &NewTag) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tags (user_id, name, color, description) VALUES (?, ?, ?, ?)",
        params![user_id, tag.name.trim(), tag.color, tag.description],
    )?;
    let id = conn.last_insert_rowid();
    debug!(tag_id = id, user_id, name = %tag.name, "Created tag");
    Ok(id)
}

pub fn create_or_get_tag(conn: &Connection, user_id: i64, name: &str) -> rusqlite::Result<Tag> {
    if let Some(existing) = get_tag_by_name(conn, user_id, name)? {
        return Ok(existing);
    }

    let id = create_tag(conn, user_id, &NewTag::named(name))?;
    get_tag(conn, user_id, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn update_tag(conn: &Connection, user_id: i64, id: i64, tag: &NewTag) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE tags SET name = ?, color = ?, description = ? WHERE id = ? AND user_id = ?",
        params![tag.name.trim(), tag.color, tag.description, id, user_id],
    )?;
    if rows > 0 {
        debug!(tag_id = id, name = %tag.name, "Updated tag");
    }
    Ok(rows > 0)
}

/// Link rows go with the tag through the foreign-key cascade.
pub fn delete_tag(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM tags WHERE id = ? AND user_id = ?", [id, user_id])?;
    if rows > 0 {
        debug!(tag_id = id, "Deleted tag");
    }
    Ok(rows > 0)
}

/// Returns false when the link already existed.
pub fn attach_tag(conn: &Connection, transaction_id: i64, tag_id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
        [transaction_id, tag_id],
    )?;
    if rows > 0 {
        debug!(transaction_id, tag_id, "Tagged transaction");
    }
    Ok(rows > 0)
}

pub fn detach_tag(conn: &Connection, transaction_id: i64, tag_id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM transaction_tags WHERE transaction_id = ? AND tag_id = ?",
        [transaction_id, tag_id],
    )?;
    Ok(rows > 0)
}

/// When the tag was attached to the transaction, if it is.
pub fn tagged_at(
    conn: &Connection,
    transaction_id: i64,
    tag_id: i64,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT tagged_at FROM transaction_tags WHERE transaction_id = ? AND tag_id = ?",
        [transaction_id, tag_id],
        |row| row.get(0),
    )
    .optional()
}
