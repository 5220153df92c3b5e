use crate::models::subscription::{NewSubscription, Subscription};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, service, monthly_amount_cents, account_id, active, start_date, created_at";

fn map_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service: row.get(2)?,
        monthly_amount_cents: row.get(3)?,
        account_id: row.get(4)?,
        active: row.get(5)?,
        start_date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn list_subscriptions(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subscriptions WHERE user_id = ? ORDER BY service, id",
        SUBSCRIPTION_COLUMNS
    ))?;

    let subscriptions = stmt
        .query_map([user_id], map_subscription)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(subscriptions)
}

pub fn list_active_subscriptions(
    conn: &Connection,
    user_id: i64,
) -> rusqlite::Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subscriptions WHERE user_id = ? AND active = 1 ORDER BY service, id",
        SUBSCRIPTION_COLUMNS
    ))?;

    let subscriptions = stmt
        .query_map([user_id], map_subscription)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(subscriptions)
}

/// Active subscriptions of every user, for the scheduled batch.
pub fn list_all_active_subscriptions(conn: &Connection) -> rusqlite::Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM subscriptions WHERE active = 1 ORDER BY id",
        SUBSCRIPTION_COLUMNS
    ))?;

    let subscriptions = stmt
        .query_map([], map_subscription)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(subscriptions)
}

pub fn get_subscription(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> rusqlite::Result<Option<Subscription>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM subscriptions WHERE id = ? AND user_id = ?",
            SUBSCRIPTION_COLUMNS
        ),
        [id, user_id],
        map_subscription,
    )
    .optional()
}

/// Sum of monthly amounts and count of the user's active subscriptions.
pub fn active_monthly_total(conn: &Connection, user_id: i64) -> rusqlite::Result<(i64, i64)> {
    conn.query_row(
        "SELECT COALESCE(SUM(monthly_amount_cents), 0), COUNT(*)
         FROM subscriptions WHERE user_id = ? AND active = 1",
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

pub fn create_subscription(
    conn: &Connection,
    user_id: i64,
    subscription: &NewSubscription,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO subscriptions (user_id, service, monthly_amount_cents, account_id, active, start_date)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            user_id,
            subscription.service.trim(),
            subscription.monthly_amount_cents,
            subscription.account_id,
            subscription.active,
            subscription.start_date,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(subscription_id = id, user_id, service = %subscription.service, "Created subscription");
    Ok(id)
}

pub fn update_subscription(
    conn: &Connection,
    user_id: i64,
    id: i64,
    subscription: &NewSubscription,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE subscriptions SET service = ?, monthly_amount_cents = ?, account_id = ?,
         active = ?, start_date = ?
         WHERE id = ? AND user_id = ?",
        params![
            subscription.service.trim(),
            subscription.monthly_amount_cents,
            subscription.account_id,
            subscription.active,
            subscription.start_date,
            id,
            user_id,
        ],
    )?;
    if rows > 0 {
        debug!(subscription_id = id, "Updated subscription");
    }
    Ok(rows > 0)
}

pub fn set_active(conn: &Connection, user_id: i64, id: i64, active: bool) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE subscriptions SET active = ? WHERE id = ? AND user_id = ?",
        params![active, id, user_id],
    )?;
    if rows > 0 {
        info!(subscription_id = id, active, "Changed subscription status");
    }
    Ok(rows > 0)
}

/// Generated charges keep existing with their subscription reference cleared.
pub fn delete_subscription(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM subscriptions WHERE id = ? AND user_id = ?",
        [id, user_id],
    )?;
    if rows > 0 {
        debug!(subscription_id = id, "Deleted subscription");
    }
    Ok(rows > 0)
}

/// Per-subscription generated spend `(subscription_id, total_cents, count)`
/// on or after `since`.
pub fn charges_since(
    conn: &Connection,
    user_id: i64,
    since: NaiveDate,
) -> rusqlite::Result<Vec<(i64, i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.subscription_id, SUM(t.amount_cents), COUNT(*)
         FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         WHERE a.user_id = ? AND t.subscription_id IS NOT NULL AND t.date >= ?
         GROUP BY t.subscription_id
         ORDER BY t.subscription_id",
    )?;
    let rows = stmt
        .query_map(params![user_id, since], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
