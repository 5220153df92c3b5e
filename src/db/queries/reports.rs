//! Read-only aggregates over a user's transactions. Every query joins
//! through `accounts` and filters on its owner.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

/// `(total_income, total_expense)` over the inclusive date range.
pub fn sum_by_kind(
    conn: &Connection,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<(i64, i64)> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN t.kind = 'income' THEN t.amount_cents ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN t.kind = 'expense' THEN t.amount_cents ELSE 0 END), 0)
         FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         WHERE a.user_id = ? AND t.date >= ? AND t.date <= ?",
        params![user_id, from, to],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

/// Largest expense in the range as `(transaction_id, description, amount)`.
/// Equal amounts resolve to the first inserted.
pub fn largest_expense(
    conn: &Connection,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Option<(i64, String, i64)>> {
    conn.query_row(
        "SELECT t.id, t.description, t.amount_cents
         FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         WHERE a.user_id = ? AND t.kind = 'expense' AND t.date >= ? AND t.date <= ?
         ORDER BY t.amount_cents DESC, t.id ASC
         LIMIT 1",
        params![user_id, from, to],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()
}

/// Expense totals per category as `(category_id, category_name, total, count)`.
/// Uncategorized expenses come back with `None` id and name.
pub fn expense_totals_by_category(
    conn: &Connection,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Vec<(Option<i64>, Option<String>, i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.category_id, c.name, SUM(t.amount_cents), COUNT(*)
         FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         LEFT JOIN categories c ON t.category_id = c.id
         WHERE a.user_id = ? AND t.kind = 'expense' AND t.date >= ? AND t.date <= ?
         GROUP BY t.category_id",
    )?;

    let rows = stmt
        .query_map(params![user_id, from, to], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Month expenses as `(description, category_name, amount)` for budget
/// matching.
pub fn expense_lines(
    conn: &Connection,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Vec<(String, Option<String>, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.description, c.name, t.amount_cents
         FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         LEFT JOIN categories c ON t.category_id = c.id
         WHERE a.user_id = ? AND t.kind = 'expense' AND t.date >= ? AND t.date <= ?
         ORDER BY t.id",
    )?;

    let rows = stmt
        .query_map(params![user_id, from, to], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// `(total_income, total_expense)` over the whole life of one account.
pub fn account_totals(conn: &Connection, account_id: i64) -> rusqlite::Result<(i64, i64)> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0)
         FROM transactions
         WHERE account_id = ?",
        [account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

pub fn count_transactions_since(
    conn: &Connection,
    user_id: i64,
    since: NaiveDate,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         WHERE a.user_id = ? AND t.date >= ?",
        params![user_id, since],
        |row| row.get(0),
    )
}
