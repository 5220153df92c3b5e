use crate::db::queries::tags::{map_tag, TAG_COLUMNS_T};
use crate::models::tag::Tag;
use crate::models::transaction::{
    NewTransaction, Transaction, TransactionKind, TransactionWithRelations,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Every read joins through `accounts` and filters on its owner, so a
/// transaction id from another user never resolves.
const SELECT_WITH_RELATIONS: &str =
    "SELECT t.id, t.account_id, t.date, t.amount_cents, t.description, t.kind,
            t.category_id, t.subscription_id, t.created_at,
            a.bank, c.name
     FROM transactions t
     JOIN accounts a ON t.account_id = a.id
     LEFT JOIN categories c ON t.category_id = c.id";

fn map_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind_str: String = row.get(5)?;
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: row.get(2)?,
        amount_cents: row.get(3)?,
        description: row.get(4)?,
        kind: TransactionKind::from_columns(&kind_str, row.get(6)?, row.get(7)?),
        created_at: row.get(8)?,
    })
}

fn map_with_relations(row: &Row<'_>) -> rusqlite::Result<TransactionWithRelations> {
    Ok(TransactionWithRelations {
        transaction: map_transaction(row)?,
        account_bank: row.get(9)?,
        category_name: row.get(10)?,
        tags: Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Income,
    Expense,
}

impl KindFilter {
    fn as_str(self) -> &'static str {
        match self {
            KindFilter::Income => "income",
            KindFilter::Expense => "expense",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub search: Option<String>,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub kind: Option<KindFilter>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from_date: Some(from),
            to_date: Some(to),
            ..Default::default()
        }
    }

    fn push_conditions(&self, sql: &mut String, params_vec: &mut Vec<Box<dyn rusqlite::ToSql>>) {
        if let Some(ref search) = self.search {
            sql.push_str(" AND t.description LIKE ?");
            params_vec.push(Box::new(format!("%{}%", search)));
        }
        if let Some(account_id) = self.account_id {
            sql.push_str(" AND t.account_id = ?");
            params_vec.push(Box::new(account_id));
        }
        if let Some(category_id) = self.category_id {
            sql.push_str(" AND t.category_id = ?");
            params_vec.push(Box::new(category_id));
        }
        if let Some(kind) = self.kind {
            sql.push_str(" AND t.kind = ?");
            params_vec.push(Box::new(kind.as_str()));
        }
        if let Some(from_date) = self.from_date {
            sql.push_str(" AND t.date >= ?");
            params_vec.push(Box::new(from_date));
        }
        if let Some(to_date) = self.to_date {
            sql.push_str(" AND t.date <= ?");
            params_vec.push(Box::new(to_date));
        }
        if let Some(tag_id) = self.tag_id {
            sql.push_str(
                " AND EXISTS(SELECT 1 FROM transaction_tags tt WHERE tt.transaction_id = t.id AND tt.tag_id = ?)",
            );
            params_vec.push(Box::new(tag_id));
        }
    }
}

/// Newest first; ties on the same date keep insertion order reversed.
pub fn list_transactions(
    conn: &Connection,
    user_id: i64,
    filter: &TransactionFilter,
) -> rusqlite::Result<Vec<TransactionWithRelations>> {
    let mut sql = format!("{} WHERE a.user_id = ?", SELECT_WITH_RELATIONS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
    filter.push_conditions(&mut sql, &mut params_vec);

    sql.push_str(" ORDER BY t.date DESC, t.id DESC");

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(Box::new(limit));
        if let Some(offset) = filter.offset {
            sql.push_str(" OFFSET ?");
            params_vec.push(Box::new(offset));
        }
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let mut transactions = stmt
        .query_map(params_refs.as_slice(), map_with_relations)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let ids: Vec<i64> = transactions.iter().map(|t| t.transaction.id).collect();
    let mut tags_map = get_tags_for_transactions(conn, &ids)?;
    for transaction in &mut transactions {
        transaction.tags = tags_map
            .remove(&transaction.transaction.id)
            .unwrap_or_default();
    }

    debug!(user_id, count = transactions.len(), "Listed transactions");
    Ok(transactions)
}

pub fn count_transactions(
    conn: &Connection,
    user_id: i64,
    filter: &TransactionFilter,
) -> rusqlite::Result<i64> {
    let mut sql = String::from(
        "SELECT COUNT(*) FROM transactions t
         JOIN accounts a ON t.account_id = a.id
         WHERE a.user_id = ?",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
    filter.push_conditions(&mut sql, &mut params_vec);

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))
}

pub fn get_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> rusqlite::Result<Option<TransactionWithRelations>> {
    trace!(transaction_id = id, "Fetching transaction");
    let transaction = conn
        .query_row(
            &format!("{} WHERE t.id = ? AND a.user_id = ?", SELECT_WITH_RELATIONS),
            [id, user_id],
            map_with_relations,
        )
        .optional()?;

    match transaction {
        Some(mut t) => {
            t.tags = get_transaction_tags(conn, id)?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

/// Inserts without ownership checks; callers verify the account, category
/// and tags belong to the acting user first.
pub fn create_transaction(conn: &Connection, transaction: &NewTransaction) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, kind, date, amount_cents, description,
         category_id, subscription_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            transaction.account_id,
            transaction.kind.as_str(),
            transaction.date,
            transaction.amount_cents,
            transaction.description.trim(),
            transaction.kind.category_id(),
            transaction.kind.subscription_id(),
        ],
    )?;
    let id = conn.last_insert_rowid();

    for tag_id in &transaction.tag_ids {
        conn.execute(
            "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
            params![id, tag_id],
        )?;
    }

    debug!(
        transaction_id = id,
        kind = transaction.kind.as_str(),
        amount_cents = transaction.amount_cents,
        "Created transaction"
    );
    Ok(id)
}

/// Inserts a generated subscription charge. Returns `None` when a charge for
/// the same subscription and day already exists (unique index hit).
pub fn insert_subscription_charge(
    conn: &Connection,
    transaction: &NewTransaction,
) -> rusqlite::Result<Option<i64>> {
    let rows = conn.execute(
        "INSERT INTO transactions (account_id, kind, date, amount_cents, description,
         category_id, subscription_id)
         VALUES (?, 'expense', ?, ?, ?, ?, ?)
         ON CONFLICT DO NOTHING",
        params![
            transaction.account_id,
            transaction.date,
            transaction.amount_cents,
            transaction.description,
            transaction.kind.category_id(),
            transaction.kind.subscription_id(),
        ],
    )?;
    if rows == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

pub fn update_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
    transaction: &NewTransaction,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE transactions SET account_id = ?, kind = ?, date = ?, amount_cents = ?,
         description = ?, category_id = ?, subscription_id = ?
         WHERE id = ? AND account_id IN (SELECT id FROM accounts WHERE user_id = ?)",
        params![
            transaction.account_id,
            transaction.kind.as_str(),
            transaction.date,
            transaction.amount_cents,
            transaction.description.trim(),
            transaction.kind.category_id(),
            transaction.kind.subscription_id(),
            id,
            user_id,
        ],
    )?;
    if rows == 0 {
        return Ok(false);
    }

    conn.execute("DELETE FROM transaction_tags WHERE transaction_id = ?", [id])?;
    for tag_id in &transaction.tag_ids {
        conn.execute(
            "INSERT OR IGNORE INTO transaction_tags (transaction_id, tag_id) VALUES (?, ?)",
            params![id, tag_id],
        )?;
    }

    debug!(transaction_id = id, "Updated transaction");
    Ok(true)
}

pub fn delete_transaction(conn: &Connection, user_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM transactions
         WHERE id = ? AND account_id IN (SELECT id FROM accounts WHERE user_id = ?)",
        [id, user_id],
    )?;
    if rows > 0 {
        debug!(transaction_id = id, "Deleted transaction");
    }
    Ok(rows > 0)
}

pub fn charge_exists_on(
    conn: &Connection,
    subscription_id: i64,
    date: NaiveDate,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE subscription_id = ? AND date = ?)",
        params![subscription_id, date],
        |row| row.get(0),
    )
}

pub fn last_charge_date(
    conn: &Connection,
    subscription_id: i64,
) -> rusqlite::Result<Option<NaiveDate>> {
    conn.query_row(
        "SELECT MAX(date) FROM transactions WHERE subscription_id = ?",
        [subscription_id],
        |row| row.get(0),
    )
}

/// Latest generated charge per subscription, across all users.
pub fn last_charge_dates(conn: &Connection) -> rusqlite::Result<HashMap<i64, NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT subscription_id, MAX(date) FROM transactions
         WHERE subscription_id IS NOT NULL
         GROUP BY subscription_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, NaiveDate>(1)?)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

pub fn has_transactions(conn: &Connection, user_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions t
                       JOIN accounts a ON t.account_id = a.id
                       WHERE a.user_id = ?)",
        [user_id],
        |row| row.get(0),
    )
}

fn get_transaction_tags(conn: &Connection, transaction_id: i64) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM tags t
         JOIN transaction_tags tt ON t.id = tt.tag_id
         WHERE tt.transaction_id = ?
         ORDER BY t.name",
        TAG_COLUMNS_T
    ))?;

    let tags = stmt
        .query_map([transaction_id], |row| map_tag(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tags)
}

fn get_tags_for_transactions(
    conn: &Connection,
    transaction_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, Vec<Tag>>> {
    if transaction_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; transaction_ids.len()].join(",");
    let sql = format!(
        "SELECT tt.transaction_id, {}
         FROM tags t
         JOIN transaction_tags tt ON t.id = tt.tag_id
         WHERE tt.transaction_id IN ({})
         ORDER BY t.name",
        TAG_COLUMNS_T, placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = transaction_ids
        .iter()
        .map(|id| id as &dyn rusqlite::ToSql)
        .collect();

    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, map_tag(row, 1)?))
    })?;

    let mut tags_map: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let (transaction_id, tag) = row?;
        tags_map.entry(transaction_id).or_default().push(tag);
    }

    Ok(tags_map)
}
