use crate::models::account::{Account, AccountKind, NewAccount};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const ACCOUNT_COLUMNS: &str = "id, user_id, bank, kind, opening_balance_cents, created_at";

fn map_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let kind_str: String = row.get(3)?;
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank: row.get(2)?,
        kind: AccountKind::parse(&kind_str).unwrap_or(AccountKind::Checking),
        opening_balance_cents: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn list_accounts(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts WHERE user_id = ? ORDER BY bank, id",
        ACCOUNT_COLUMNS
    ))?;

    let accounts = stmt
        .query_map([user_id], map_account)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(accounts)
}

pub fn get_account(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM accounts WHERE id = ? AND user_id = ?",
            ACCOUNT_COLUMNS
        ),
        [id, user_id],
        map_account,
    )
    .optional()
}

/// The user's oldest account, used as the fallback charge destination.
pub fn first_account(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY id LIMIT 1",
            ACCOUNT_COLUMNS
        ),
        [user_id],
        map_account,
    )
    .optional()
}

pub fn count_accounts(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE user_id = ?",
        [user_id],
        |row| row.get(0),
    )
}

pub fn create_account(conn: &Connection, user_id: i64, account: &NewAccount) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO accounts (user_id, bank, kind, opening_balance_cents) VALUES (?, ?, ?, ?)",
        params![
            user_id,
            account.bank.trim(),
            account.kind.as_str(),
            account.opening_balance_cents
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(account_id = id, user_id, bank = %account.bank, "Created account");
    Ok(id)
}

/// Updates the label and kind. The opening balance is a historical
/// reference and is left untouched.
pub fn update_account(
    conn: &Connection,
    user_id: i64,
    id: i64,
    account: &NewAccount,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE accounts SET bank = ?, kind = ? WHERE id = ? AND user_id = ?",
        params![account.bank.trim(), account.kind.as_str(), id, user_id],
    )?;
    if rows > 0 {
        info!(account_id = id, bank = %account.bank, "Updated account");
    }
    Ok(rows > 0)
}

pub fn delete_account(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM accounts WHERE id = ? AND user_id = ?",
        [id, user_id],
    )?;
    if rows > 0 {
        info!(account_id = id, "Deleted account");
    }
    Ok(rows > 0)
}
