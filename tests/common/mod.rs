//! Shared test utilities for integration tests.
//!
//! `TestLedger` wraps a fresh in-memory database with migrations applied
//! and offers shortcuts for the entities most tests need. Methods are
//! intentionally broad to support various test scenarios across files.

#![allow(dead_code)]

use chrono::NaiveDate;
use ledgerdesk::auth;
use ledgerdesk::db::{create_in_memory_pool, create_pool, migrations, DbPool};
use ledgerdesk::models::{
    AccountKind, NewAccount, NewBudget, NewCategory, NewSubscription, NewTransaction, NewUser,
};
use ledgerdesk::services::ledger;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

pub type Conn = PooledConnection<SqliteConnectionManager>;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

pub fn migrate(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get connection");
    migrations::run_migrations(&mut conn, Path::new("migrations"))
        .expect("Failed to run migrations");
}

/// A ledger over a private in-memory database.
pub struct TestLedger {
    pub pool: DbPool,
}

impl TestLedger {
    pub fn new() -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        migrate(&pool);
        Self { pool }
    }

    /// File-backed pool for tests that need several connections at once.
    pub fn on_disk(path: &Path) -> Self {
        let pool = create_pool(path).expect("Failed to create pool");
        migrate(&pool);
        Self { pool }
    }

    pub fn conn(&self) -> Conn {
        self.pool.get().expect("Failed to get connection")
    }

    pub fn user(&self, name: &str) -> i64 {
        let conn = self.conn();
        auth::register_user(
            &conn,
            &NewUser {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "secret123".into(),
            },
        )
        .expect("Failed to register user")
    }

    pub fn account(&self, user_id: i64, bank: &str, opening_cents: i64) -> i64 {
        let conn = self.conn();
        ledger::create_account(
            &conn,
            user_id,
            &NewAccount {
                bank: bank.into(),
                kind: AccountKind::Checking,
                opening_balance_cents: opening_cents,
            },
        )
        .expect("Failed to create account")
    }

    pub fn category(&self, user_id: i64, name: &str) -> i64 {
        let conn = self.conn();
        ledger::create_category(&conn, user_id, &NewCategory::expense(name))
            .expect("Failed to create category")
    }

    pub fn income(&self, user_id: i64, account_id: i64, date: NaiveDate, cents: i64) -> i64 {
        let mut conn = self.conn();
        ledger::create_transaction(
            &mut conn,
            user_id,
            &NewTransaction::income(account_id, date, cents, "Salary"),
        )
        .expect("Failed to create income")
    }

    pub fn expense(
        &self,
        user_id: i64,
        account_id: i64,
        date: NaiveDate,
        cents: i64,
        description: &str,
        category_id: Option<i64>,
    ) -> i64 {
        let mut conn = self.conn();
        ledger::create_transaction(
            &mut conn,
            user_id,
            &NewTransaction::expense(account_id, date, cents, description, category_id),
        )
        .expect("Failed to create expense")
    }

    pub fn subscription(
        &self,
        user_id: i64,
        service: &str,
        monthly_cents: i64,
        account_id: Option<i64>,
        start_date: NaiveDate,
    ) -> i64 {
        let conn = self.conn();
        ledger::create_subscription(
            &conn,
            user_id,
            &NewSubscription {
                service: service.into(),
                monthly_amount_cents: monthly_cents,
                account_id,
                active: true,
                start_date,
            },
        )
        .expect("Failed to create subscription")
    }

    pub fn budget(&self, user_id: i64, name: &str, limit_cents: i64) -> i64 {
        let conn = self.conn();
        ledger::create_budget(
            &conn,
            user_id,
            &NewBudget {
                name: name.into(),
                limit_cents,
            },
        )
        .expect("Failed to create budget")
    }

    /// Rows generated for a subscription, regardless of owner.
    pub fn charge_count(&self, subscription_id: i64) -> i64 {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE subscription_id = ?",
                [subscription_id],
                |row| row.get(0),
            )
            .expect("Failed to count charges")
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .expect("Failed to count rows")
    }
}
