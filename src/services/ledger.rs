//! Validated, ownership-checked writes over the store.
//!
//! Query functions trust their inputs; everything here checks that every
//! referenced account, category, subscription and tag belongs to the acting
//! user before touching a row. Absent and foreign ids both surface as
//! `AppError::NotFound`.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::queries::transactions::TransactionFilter;
use crate::db::queries::{
    accounts, budgets, categories, subscriptions, tags, transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Account, AccountWithBalance, NewAccount, NewBudget, NewCategory, NewSubscription, NewTag,
    NewTransaction, Subscription, TransactionWithRelations,
};
use crate::services::aggregation;

fn require(found: bool, entity: &str, id: i64) -> AppResult<()> {
    if found {
        Ok(())
    } else {
        Err(AppError::not_found(entity, id))
    }
}

// Accounts

pub fn create_account(conn: &Connection, user_id: i64, account: &NewAccount) -> AppResult<i64> {
    account.validate()?;
    Ok(accounts::create_account(conn, user_id, account)?)
}

pub fn get_account(conn: &Connection, user_id: i64, id: i64) -> AppResult<Account> {
    accounts::get_account(conn, user_id, id)?.ok_or_else(|| AppError::not_found("Account", id))
}

pub fn update_account(
    conn: &Connection,
    user_id: i64,
    id: i64,
    account: &NewAccount,
) -> AppResult<()> {
    account.validate()?;
    require(
        accounts::update_account(conn, user_id, id, account)?,
        "Account",
        id,
    )
}

pub fn delete_account(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(accounts::delete_account(conn, user_id, id)?, "Account", id)
}

pub fn list_accounts_with_balance(
    conn: &Connection,
    user_id: i64,
) -> AppResult<Vec<AccountWithBalance>> {
    accounts::list_accounts(conn, user_id)?
        .into_iter()
        .map(|account| {
            let balance_cents = aggregation::account_balance(conn, user_id, account.id)?;
            Ok(AccountWithBalance {
                account,
                balance_cents,
            })
        })
        .collect()
}

// Categories

pub fn create_category(conn: &Connection, user_id: i64, category: &NewCategory) -> AppResult<i64> {
    category.validate()?;
    Ok(categories::create_category(conn, user_id, category)?)
}

pub fn update_category(
    conn: &Connection,
    user_id: i64,
    id: i64,
    category: &NewCategory,
) -> AppResult<()> {
    category.validate()?;
    require(
        categories::update_category(conn, user_id, id, category)?,
        "Category",
        id,
    )
}

pub fn delete_category(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(
        categories::delete_category(conn, user_id, id)?,
        "Category",
        id,
    )
}

// Transactions

fn check_transaction_refs(conn: &Connection, user_id: i64, tx: &NewTransaction) -> AppResult<()> {
    if accounts::get_account(conn, user_id, tx.account_id)?.is_none() {
        return Err(AppError::not_found("Account", tx.account_id));
    }
    if let Some(category_id) = tx.kind.category_id() {
        if categories::get_category(conn, user_id, category_id)?.is_none() {
            return Err(AppError::not_found("Category", category_id));
        }
    }
    if let Some(subscription_id) = tx.kind.subscription_id() {
        if subscriptions::get_subscription(conn, user_id, subscription_id)?.is_none() {
            return Err(AppError::not_found("Subscription", subscription_id));
        }
    }
    for &tag_id in &tx.tag_ids {
        if tags::get_tag(conn, user_id, tag_id)?.is_none() {
            return Err(AppError::not_found("Tag", tag_id));
        }
    }
    Ok(())
}

pub fn create_transaction(
    conn: &mut Connection,
    user_id: i64,
    new_transaction: &NewTransaction,
) -> AppResult<i64> {
    new_transaction.validate()?;
    let tx = conn.transaction()?;

    check_transaction_refs(&tx, user_id, new_transaction)?;
    let id = transactions::create_transaction(&tx, new_transaction)?;

    tx.commit()?;
    info!(transaction_id = id, user_id, "Transaction recorded");
    Ok(id)
}

pub fn get_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> AppResult<TransactionWithRelations> {
    transactions::get_transaction(conn, user_id, id)?
        .ok_or_else(|| AppError::not_found("Transaction", id))
}

pub fn update_transaction(
    conn: &mut Connection,
    user_id: i64,
    id: i64,
    new_transaction: &NewTransaction,
) -> AppResult<()> {
    new_transaction.validate()?;
    let tx = conn.transaction()?;

    check_transaction_refs(&tx, user_id, new_transaction)?;
    require(
        transactions::update_transaction(&tx, user_id, id, new_transaction)?,
        "Transaction",
        id,
    )?;

    tx.commit()?;
    Ok(())
}

pub fn delete_transaction(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(
        transactions::delete_transaction(conn, user_id, id)?,
        "Transaction",
        id,
    )
}

pub fn transactions_by_tag(
    conn: &Connection,
    user_id: i64,
    tag_id: i64,
) -> AppResult<Vec<TransactionWithRelations>> {
    get_tag_checked(conn, user_id, tag_id)?;
    let filter = TransactionFilter {
        tag_id: Some(tag_id),
        ..Default::default()
    };
    Ok(transactions::list_transactions(conn, user_id, &filter)?)
}

// Subscriptions

fn check_subscription_account(
    conn: &Connection,
    user_id: i64,
    subscription: &NewSubscription,
) -> AppResult<()> {
    if let Some(account_id) = subscription.account_id {
        if accounts::get_account(conn, user_id, account_id)?.is_none() {
            return Err(AppError::not_found("Account", account_id));
        }
    }
    Ok(())
}

pub fn create_subscription(
    conn: &Connection,
    user_id: i64,
    subscription: &NewSubscription,
) -> AppResult<i64> {
    subscription.validate()?;
    check_subscription_account(conn, user_id, subscription)?;
    Ok(subscriptions::create_subscription(conn, user_id, subscription)?)
}

pub fn get_subscription(conn: &Connection, user_id: i64, id: i64) -> AppResult<Subscription> {
    subscriptions::get_subscription(conn, user_id, id)?
        .ok_or_else(|| AppError::not_found("Subscription", id))
}

pub fn update_subscription(
    conn: &Connection,
    user_id: i64,
    id: i64,
    subscription: &NewSubscription,
) -> AppResult<()> {
    subscription.validate()?;
    check_subscription_account(conn, user_id, subscription)?;
    require(
        subscriptions::update_subscription(conn, user_id, id, subscription)?,
        "Subscription",
        id,
    )
}

pub fn set_subscription_active(
    conn: &Connection,
    user_id: i64,
    id: i64,
    active: bool,
) -> AppResult<()> {
    require(
        subscriptions::set_active(conn, user_id, id, active)?,
        "Subscription",
        id,
    )
}

pub fn delete_subscription(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(
        subscriptions::delete_subscription(conn, user_id, id)?,
        "Subscription",
        id,
    )
}

// Budgets

pub fn create_budget(conn: &Connection, user_id: i64, budget: &NewBudget) -> AppResult<i64> {
    budget.validate()?;
    Ok(budgets::create_budget(conn, user_id, budget)?)
}

pub fn update_budget(conn: &Connection, user_id: i64, id: i64, budget: &NewBudget) -> AppResult<()> {
    budget.validate()?;
    require(
        budgets::update_budget(conn, user_id, id, budget)?,
        "Budget",
        id,
    )
}

pub fn delete_budget(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(budgets::delete_budget(conn, user_id, id)?, "Budget", id)
}

// Tags

fn get_tag_checked(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    match tags::get_tag(conn, user_id, id)? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Tag", id)),
    }
}

pub fn create_tag(conn: &Connection, user_id: i64, tag: &NewTag) -> AppResult<i64> {
    tag.validate()?;
    if tags::get_tag_by_name(conn, user_id, tag.name.trim())?.is_some() {
        return Err(AppError::Validation(format!(
            "Tag '{}' already exists",
            tag.name.trim()
        )));
    }
    Ok(tags::create_tag(conn, user_id, tag)?)
}

pub fn update_tag(conn: &Connection, user_id: i64, id: i64, tag: &NewTag) -> AppResult<()> {
    tag.validate()?;
    if let Some(existing) = tags::get_tag_by_name(conn, user_id, tag.name.trim())? {
        if existing.id != id {
            return Err(AppError::Validation(format!(
                "Tag '{}' already exists",
                tag.name.trim()
            )));
        }
    }
    require(tags::update_tag(conn, user_id, id, tag)?, "Tag", id)
}

pub fn delete_tag(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    require(tags::delete_tag(conn, user_id, id)?, "Tag", id)
}

/// Returns false when the transaction already carried the tag.
pub fn tag_transaction(
    conn: &Connection,
    user_id: i64,
    transaction_id: i64,
    tag_id: i64,
) -> AppResult<bool> {
    get_transaction(conn, user_id, transaction_id)?;
    get_tag_checked(conn, user_id, tag_id)?;
    Ok(tags::attach_tag(conn, transaction_id, tag_id)?)
}

pub fn untag_transaction(
    conn: &Connection,
    user_id: i64,
    transaction_id: i64,
    tag_id: i64,
) -> AppResult<bool> {
    get_transaction(conn, user_id, transaction_id)?;
    get_tag_checked(conn, user_id, tag_id)?;
    let removed = tags::detach_tag(conn, transaction_id, tag_id)?;
    debug!(transaction_id, tag_id, removed, "Untagged transaction");
    Ok(removed)
}
