//! Materializes subscription charges as expense transactions.
//!
//! Each charge is written inside its own `BEGIN IMMEDIATE` transaction and
//! the store rejects a second generated row for the same subscription and
//! day, so a manual charge racing the daily batch still yields one expense.

use chrono::{Duration, Months, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::queries::{accounts, categories, subscriptions, transactions};
use crate::error::AppResult;
use crate::models::{
    NewAccount, NewCategory, NewTransaction, Subscription, TransactionKind, UpcomingSubscription,
};

/// Category names a generated charge is filed under, matched case-insensitively.
const SUBSCRIPTION_CATEGORY_HINTS: &[&str] = &["subscription", "recurring"];
const SUBSCRIPTION_CATEGORY_NAME: &str = "Subscriptions";

/// Counters from one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Active subscriptions scanned.
    pub examined: usize,
    pub created: usize,
    pub skipped_duplicate: usize,
    pub skipped_no_account: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Created(i64),
    /// A generated charge for this subscription already exists today.
    AlreadyCharged,
    /// The owner has no account and none may be created.
    NoAccount,
    /// Absent or owned by someone else.
    NotFound,
    Inactive,
}

impl ChargeOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, ChargeOutcome::Created(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingAccount {
    Skip,
    CreatePlaceholder,
}

/// Charges every active subscription that is due on `today`, across all
/// users. Per-subscription failures are logged and counted; only failing to
/// list the subscriptions aborts the run.
pub fn materialize_due_charges(conn: &mut Connection, today: NaiveDate) -> AppResult<RunReport> {
    let due_candidates = subscriptions::list_all_active_subscriptions(conn)?;
    let last_charges = transactions::last_charge_dates(conn)?;
    let mut report = RunReport::default();

    for subscription in &due_candidates {
        report.examined += 1;
        let last_charge = last_charges.get(&subscription.id).copied();
        if !subscription.is_due(last_charge, today) {
            continue;
        }

        match charge_subscription(conn, subscription, today, MissingAccount::Skip) {
            Ok(ChargeOutcome::Created(_)) => report.created += 1,
            Ok(ChargeOutcome::AlreadyCharged) => report.skipped_duplicate += 1,
            Ok(ChargeOutcome::NoAccount) => {
                warn!(
                    subscription_id = subscription.id,
                    user_id = subscription.user_id,
                    "Skipping subscription charge, owner has no account"
                );
                report.skipped_no_account += 1;
            }
            Ok(ChargeOutcome::NotFound | ChargeOutcome::Inactive) => {}
            Err(e) => {
                warn!(
                    subscription_id = subscription.id,
                    error = %e,
                    "Failed to charge subscription"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        examined = report.examined,
        created = report.created,
        skipped_duplicate = report.skipped_duplicate,
        skipped_no_account = report.skipped_no_account,
        failed = report.failed,
        "Subscription charge run finished"
    );
    Ok(report)
}

/// Charges one subscription on behalf of its owner, regardless of the due
/// date but never twice on the same day. Creates a placeholder account when
/// the owner has none.
pub fn charge_now(
    conn: &mut Connection,
    subscription_id: i64,
    user_id: i64,
    today: NaiveDate,
) -> AppResult<ChargeOutcome> {
    let Some(subscription) = subscriptions::get_subscription(conn, user_id, subscription_id)?
    else {
        warn!(subscription_id, user_id, "Manual charge for unknown subscription");
        return Ok(ChargeOutcome::NotFound);
    };
    if !subscription.active {
        debug!(subscription_id, "Manual charge for inactive subscription");
        return Ok(ChargeOutcome::Inactive);
    }

    charge_subscription(conn, &subscription, today, MissingAccount::CreatePlaceholder)
}

/// Returns whether a charge was created.
pub fn materialize_charge(
    conn: &mut Connection,
    subscription_id: i64,
    user_id: i64,
    today: NaiveDate,
) -> AppResult<bool> {
    Ok(charge_now(conn, subscription_id, user_id, today)?.is_created())
}

fn charge_subscription(
    conn: &mut Connection,
    subscription: &Subscription,
    today: NaiveDate,
    missing_account: MissingAccount,
) -> AppResult<ChargeOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if transactions::charge_exists_on(&tx, subscription.id, today)? {
        debug!(subscription_id = subscription.id, %today, "Already charged today");
        return Ok(ChargeOutcome::AlreadyCharged);
    }

    let account_id = match resolve_account(&tx, subscription)? {
        Some(id) => id,
        None if missing_account == MissingAccount::CreatePlaceholder => {
            accounts::create_account(&tx, subscription.user_id, &NewAccount::placeholder())?
        }
        None => return Ok(ChargeOutcome::NoAccount),
    };
    let category_id = resolve_category(&tx, subscription.user_id)?;

    let charge = NewTransaction {
        account_id,
        date: today,
        amount_cents: subscription.monthly_amount_cents,
        description: subscription.charge_description(),
        kind: TransactionKind::Expense {
            category_id: Some(category_id),
            subscription_id: Some(subscription.id),
        },
        tag_ids: Vec::new(),
    };

    match transactions::insert_subscription_charge(&tx, &charge)? {
        Some(id) => {
            tx.commit()?;
            info!(
                subscription_id = subscription.id,
                transaction_id = id,
                amount_cents = charge.amount_cents,
                "Generated subscription charge"
            );
            Ok(ChargeOutcome::Created(id))
        }
        None => Ok(ChargeOutcome::AlreadyCharged),
    }
}

/// The linked account if the owner still has it, else their oldest account.
fn resolve_account(conn: &Connection, subscription: &Subscription) -> AppResult<Option<i64>> {
    if let Some(account_id) = subscription.account_id {
        if accounts::get_account(conn, subscription.user_id, account_id)?.is_some() {
            return Ok(Some(account_id));
        }
    }
    Ok(accounts::first_account(conn, subscription.user_id)?.map(|a| a.id))
}

fn resolve_category(conn: &Connection, user_id: i64) -> AppResult<i64> {
    if let Some(category) =
        categories::find_category_containing(conn, user_id, SUBSCRIPTION_CATEGORY_HINTS)?
    {
        return Ok(category.id);
    }
    let id = categories::create_category(
        conn,
        user_id,
        &NewCategory::expense(SUBSCRIPTION_CATEGORY_NAME),
    )?;
    Ok(id)
}

/// Active subscriptions due within `days_ahead` days of `today` (overdue
/// ones included), soonest first.
pub fn upcoming_subscriptions(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
    days_ahead: i64,
) -> AppResult<Vec<UpcomingSubscription>> {
    let horizon = today + Duration::days(days_ahead);
    let mut upcoming = Vec::new();

    for subscription in subscriptions::list_active_subscriptions(conn, user_id)? {
        let last_charge = transactions::last_charge_date(conn, subscription.id)?;
        let next_due_date = subscription.next_due_date(last_charge, today);
        if next_due_date <= horizon {
            upcoming.push(UpcomingSubscription {
                subscription,
                next_due_date,
            });
        }
    }

    upcoming.sort_by(|a, b| {
        a.next_due_date
            .cmp(&b.next_due_date)
            .then_with(|| a.subscription.service.cmp(&b.subscription.service))
    });
    Ok(upcoming)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionTotals {
    pub monthly_cents: i64,
    pub annual_cents: i64,
    pub active_count: i64,
}

pub fn monthly_subscription_total(conn: &Connection, user_id: i64) -> AppResult<SubscriptionTotals> {
    let (monthly_cents, active_count) = subscriptions::active_monthly_total(conn, user_id)?;
    Ok(SubscriptionTotals {
        monthly_cents,
        annual_cents: monthly_cents * 12,
        active_count,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionLine {
    pub subscription: Subscription,
    pub next_due_date: NaiveDate,
    pub annual_cents: i64,
    /// Generated charges over the past year.
    pub charged_cents: i64,
    pub charge_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionReport {
    pub lines: Vec<SubscriptionLine>,
    pub totals: SubscriptionTotals,
}

pub fn subscription_report(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
) -> AppResult<SubscriptionReport> {
    let since = today.checked_sub_months(Months::new(12)).unwrap_or(today);
    let spend: Vec<(i64, i64, i64)> = subscriptions::charges_since(conn, user_id, since)?;

    let mut lines = Vec::new();
    for subscription in subscriptions::list_active_subscriptions(conn, user_id)? {
        let last_charge = transactions::last_charge_date(conn, subscription.id)?;
        let (charged_cents, charge_count) = spend
            .iter()
            .find(|(id, _, _)| *id == subscription.id)
            .map(|(_, total, count)| (*total, *count))
            .unwrap_or((0, 0));
        lines.push(SubscriptionLine {
            next_due_date: subscription.next_due_date(last_charge, today),
            annual_cents: subscription.annual_cost_cents(),
            subscription,
            charged_cents,
            charge_count,
        });
    }

    Ok(SubscriptionReport {
        lines,
        totals: monthly_subscription_total(conn, user_id)?,
    })
}
