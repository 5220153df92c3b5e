//! Integration tests for subscription charge generation.

mod common;

use common::{d, TestLedger};
use ledgerdesk::db::queries::{accounts, transactions};
use ledgerdesk::models::DEFAULT_ACCOUNT_BANK;
use ledgerdesk::services::{ledger, recurring};
use ledgerdesk::services::recurring::ChargeOutcome;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_batch_run_twice_same_day_creates_one_charge() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let account = db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Netflix", 3990, Some(account), d(2024, 1, 15));

    let mut conn = db.conn();
    let first = recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    let second = recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    drop(conn);

    assert_eq!(first.examined, 1);
    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(db.charge_count(sub), 1);
}

#[test]
fn test_generated_charge_fields() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let account = db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Spotify", 2190, None, d(2024, 3, 2));

    let mut conn = db.conn();
    let outcome = recurring::charge_now(&mut conn, sub, user, d(2024, 6, 20)).unwrap();
    let ChargeOutcome::Created(id) = outcome else {
        panic!("expected a charge, got {:?}", outcome);
    };

    let charge = ledger::get_transaction(&conn, user, id).unwrap();
    assert_eq!(charge.transaction.account_id, account);
    assert_eq!(charge.transaction.date, d(2024, 6, 20));
    assert_eq!(charge.transaction.amount_cents, 2190);
    assert_eq!(charge.transaction.description, "Subscription - Spotify (auto)");
    assert_eq!(charge.transaction.kind.subscription_id(), Some(sub));
    assert_eq!(charge.category_name.as_deref(), Some("Subscriptions"));
}

#[test]
fn test_existing_recurring_category_is_reused() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    db.category(user, "Food");
    let recurring_bills = db.category(user, "Recurring bills");
    let sub = db.subscription(user, "Gym", 9900, None, d(2024, 6, 1));

    let mut conn = db.conn();
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 1)).unwrap();
    drop(conn);

    let category_id: Option<i64> = db
        .conn()
        .query_row(
            "SELECT category_id FROM transactions WHERE subscription_id = ?",
            [sub],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(category_id, Some(recurring_bills));
    assert_eq!(db.count("categories"), 2);
}

#[test]
fn test_due_date_advances_after_charge() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));
    let today = d(2024, 6, 20);

    let mut conn = db.conn();
    let before = recurring::upcoming_subscriptions(&conn, user, today, 5).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].next_due_date, d(2024, 6, 15));

    recurring::materialize_due_charges(&mut conn, today).unwrap();

    assert!(recurring::upcoming_subscriptions(&conn, user, today, 5)
        .unwrap()
        .is_empty());
    let month_ahead = recurring::upcoming_subscriptions(&conn, user, today, 30).unwrap();
    assert_eq!(month_ahead[0].next_due_date, d(2024, 7, 15));
}

#[test]
fn test_next_cycle_is_charged_again() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    let early = recurring::materialize_due_charges(&mut conn, d(2024, 7, 14)).unwrap();
    let on_cycle = recurring::materialize_due_charges(&mut conn, d(2024, 7, 15)).unwrap();
    drop(conn);

    assert_eq!(early.created, 0);
    assert_eq!(on_cycle.created, 1);
    assert_eq!(db.charge_count(sub), 2);
}

#[test]
fn test_future_and_inactive_subscriptions_are_not_charged() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let future = db.subscription(user, "Disney", 2790, None, d(2024, 7, 1));
    let paused = db.subscription(user, "Prime", 1490, None, d(2024, 1, 1));

    let mut conn = db.conn();
    ledger::set_subscription_active(&conn, user, paused, false).unwrap();
    let report = recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    drop(conn);

    assert_eq!(report.examined, 1);
    assert_eq!(report.created, 0);
    assert_eq!(db.charge_count(future), 0);
    assert_eq!(db.charge_count(paused), 0);
}

#[test]
fn test_batch_skips_owner_without_account() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    let report = recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    drop(conn);

    assert_eq!(report.skipped_no_account, 1);
    assert_eq!(report.created, 0);
    assert_eq!(db.charge_count(sub), 0);
    assert_eq!(db.count("accounts"), 0);
}

#[test]
fn test_manual_charge_creates_placeholder_account() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    assert!(recurring::materialize_charge(&mut conn, sub, user, d(2024, 6, 20)).unwrap());

    let account = accounts::first_account(&conn, user).unwrap().unwrap();
    assert_eq!(account.bank, DEFAULT_ACCOUNT_BANK);
    assert_eq!(account.opening_balance_cents, 0);
    drop(conn);
    assert_eq!(db.charge_count(sub), 1);
}

#[test]
fn test_manual_charge_ignores_due_date_but_not_twice_a_day() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();
    let again_today = recurring::charge_now(&mut conn, sub, user, d(2024, 6, 20)).unwrap();
    let next_day = recurring::charge_now(&mut conn, sub, user, d(2024, 6, 21)).unwrap();
    drop(conn);

    assert_eq!(again_today, ChargeOutcome::AlreadyCharged);
    assert!(next_day.is_created());
    assert_eq!(db.charge_count(sub), 2);
}

#[test]
fn test_manual_charge_rejects_other_users_subscription() {
    let db = TestLedger::new();
    let alice = db.user("Alice");
    let bob = db.user("Bob");
    db.account(alice, "Alice bank", 0);
    db.account(bob, "Bob bank", 0);
    let bobs_sub = db.subscription(bob, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    let outcome = recurring::charge_now(&mut conn, bobs_sub, alice, d(2024, 6, 20)).unwrap();
    let created = recurring::materialize_charge(&mut conn, bobs_sub, alice, d(2024, 6, 20)).unwrap();
    drop(conn);

    assert_eq!(outcome, ChargeOutcome::NotFound);
    assert!(!created);
    assert_eq!(db.count("transactions"), 0);
    assert_eq!(db.count("categories"), 0);
}

#[test]
fn test_manual_charge_of_inactive_subscription() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let mut conn = db.conn();
    ledger::set_subscription_active(&conn, user, sub, false).unwrap();
    let outcome = recurring::charge_now(&mut conn, sub, user, d(2024, 6, 20)).unwrap();

    assert_eq!(outcome, ChargeOutcome::Inactive);
}

#[test]
fn test_linked_account_is_preferred_over_first_account() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "First", 0);
    let card = db.account(user, "Card", 0);
    let sub = db.subscription(user, "Netflix", 3990, Some(card), d(2024, 6, 1));

    let mut conn = db.conn();
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 1)).unwrap();
    drop(conn);

    let account_id: i64 = db
        .conn()
        .query_row(
            "SELECT account_id FROM transactions WHERE subscription_id = ?",
            [sub],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(account_id, card);
}

#[test]
fn test_deleted_linked_account_falls_back_to_first_account() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let first = db.account(user, "First", 0);
    let card = db.account(user, "Card", 0);
    let sub = db.subscription(user, "Netflix", 3990, Some(card), d(2024, 6, 1));

    let mut conn = db.conn();
    ledger::delete_account(&conn, user, card).unwrap();
    assert_eq!(ledger::get_subscription(&conn, user, sub).unwrap().account_id, None);
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 1)).unwrap();

    assert_eq!(transactions::last_charge_date(&conn, sub).unwrap(), Some(d(2024, 6, 1)));
    let account_id: i64 = conn
        .query_row(
            "SELECT account_id FROM transactions WHERE subscription_id = ?",
            [sub],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(account_id, first);
}

#[test]
fn test_subscription_totals_and_report() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let netflix = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));
    db.subscription(user, "Spotify", 2190, None, d(2024, 1, 10));
    let paused = db.subscription(user, "Prime", 1490, None, d(2024, 1, 1));

    let mut conn = db.conn();
    ledger::set_subscription_active(&conn, user, paused, false).unwrap();
    recurring::materialize_due_charges(&mut conn, d(2024, 5, 20)).unwrap();
    recurring::materialize_due_charges(&mut conn, d(2024, 6, 20)).unwrap();

    let totals = recurring::monthly_subscription_total(&conn, user).unwrap();
    assert_eq!(totals.monthly_cents, 6180);
    assert_eq!(totals.annual_cents, 6180 * 12);
    assert_eq!(totals.active_count, 2);

    let report = recurring::subscription_report(&conn, user, d(2024, 6, 20)).unwrap();
    assert_eq!(report.lines.len(), 2);
    let line = report
        .lines
        .iter()
        .find(|l| l.subscription.id == netflix)
        .unwrap();
    assert_eq!(line.annual_cents, 3990 * 12);
    assert_eq!(line.charge_count, 2);
    assert_eq!(line.charged_cents, 7980);
    assert_eq!(line.next_due_date, d(2024, 7, 15));
}

#[test]
fn test_concurrent_manual_and_batch_never_double_charge() {
    let dir = tempfile::tempdir().unwrap();
    let db = TestLedger::on_disk(&dir.path().join("db.db"));
    let user = db.user("Ana");
    db.account(user, "Nubank", 0);
    let subs: Vec<i64> = (0..8)
        .map(|i| db.subscription(user, &format!("Service {}", i), 1000 + i, None, d(2024, 1, 15)))
        .collect();
    let today = d(2024, 6, 20);

    let barrier = Arc::new(Barrier::new(2));

    let manual = {
        let pool = db.pool.clone();
        let barrier = Arc::clone(&barrier);
        let subs = subs.clone();
        thread::spawn(move || {
            let mut conn = pool.get().unwrap();
            barrier.wait();
            subs.iter()
                .filter(|&&sub| recurring::materialize_charge(&mut conn, sub, user, today).unwrap())
                .count()
        })
    };
    let batch = {
        let pool = db.pool.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let mut conn = pool.get().unwrap();
            barrier.wait();
            recurring::materialize_due_charges(&mut conn, today).unwrap()
        })
    };

    let manual_created = manual.join().unwrap();
    let report = batch.join().unwrap();

    assert_eq!(manual_created + report.created, subs.len());
    for sub in subs {
        assert_eq!(db.charge_count(sub), 1, "subscription {} charged twice", sub);
    }
}

#[test]
fn test_unique_index_rejects_second_generated_row() {
    let db = TestLedger::new();
    let user = db.user("Ana");
    let account = db.account(user, "Nubank", 0);
    let sub = db.subscription(user, "Netflix", 3990, None, d(2024, 1, 15));

    let conn = db.conn();
    let insert = |conn: &rusqlite::Connection| {
        conn.execute(
            "INSERT INTO transactions (account_id, kind, date, amount_cents, description, subscription_id)
             VALUES (?, 'expense', '2024-06-20', 3990, 'manual copy', ?)",
            [account, sub],
        )
    };
    insert(&*conn).unwrap();
    assert!(insert(&*conn).is_err());
}
