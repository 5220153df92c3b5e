use chrono::{Duration, Months, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::date_utils::MonthRef;
use crate::db::queries::transactions::TransactionFilter;
use crate::db::queries::{accounts, budgets, categories, reports, subscriptions, transactions};
use crate::error::{AppError, AppResult};
use crate::models::{Budget, TransactionWithRelations};

pub const UNCATEGORIZED: &str = "Uncategorized";

pub const NOTE_NO_ACCOUNT: &str = "No account registered";
pub const NOTE_NEW_USER: &str = "Create your first account to get started!";
pub const NOTE_NO_EXPENSES: &str = "No expenses recorded this month";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestExpense {
    pub transaction_id: i64,
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: MonthRef,
    pub total_income: i64,
    pub total_expense: i64,
    pub balance: i64,
    pub largest_expense: Option<LargestExpense>,
    /// Set when there is nothing to summarize.
    pub note: Option<String>,
}

pub fn monthly_summary(conn: &Connection, user_id: i64, month: MonthRef) -> AppResult<MonthlySummary> {
    if accounts::count_accounts(conn, user_id)? == 0 {
        let note = if is_new_user(conn, user_id)? {
            NOTE_NEW_USER
        } else {
            NOTE_NO_ACCOUNT
        };
        return Ok(MonthlySummary {
            month,
            total_income: 0,
            total_expense: 0,
            balance: 0,
            largest_expense: None,
            note: Some(note.to_string()),
        });
    }

    let (from, to) = month.range();
    let (total_income, total_expense) = reports::sum_by_kind(conn, user_id, from, to)?;
    let largest_expense = reports::largest_expense(conn, user_id, from, to)?.map(
        |(transaction_id, description, amount_cents)| LargestExpense {
            transaction_id,
            description,
            amount_cents,
        },
    );
    let note = largest_expense
        .is_none()
        .then(|| NOTE_NO_EXPENSES.to_string());

    Ok(MonthlySummary {
        month,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        largest_expense,
        note,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpend {
    /// `None` for the uncategorized bucket.
    pub category_id: Option<i64>,
    pub category: String,
    pub total_cents: i64,
    pub transaction_count: i64,
    pub percentage: f64,
}

/// Month expenses grouped by category, largest first.
pub fn category_spend(conn: &Connection, user_id: i64, month: MonthRef) -> AppResult<Vec<CategorySpend>> {
    let (from, to) = month.range();
    let rows = reports::expense_totals_by_category(conn, user_id, from, to)?;
    let total: i64 = rows.iter().map(|(_, _, total, _)| total).sum();

    let mut result: Vec<CategorySpend> = rows
        .into_iter()
        .map(|(category_id, name, total_cents, transaction_count)| CategorySpend {
            category_id,
            category: name.unwrap_or_else(|| UNCATEGORIZED.into()),
            total_cents,
            transaction_count,
            percentage: if total > 0 {
                (total_cents as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_cents
            .cmp(&a.total_cents)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(result)
}

/// Description keywords for budgets whose name mentions a known family.
const KEYWORD_FAMILIES: &[(&str, &[&str])] = &[
    (
        "food",
        &["food", "groceries", "grocery", "restaurant", "delivery", "supermarket", "ifood"],
    ),
    (
        "transport",
        &["transport", "fuel", "gasoline", "uber", "taxi", "metro", "parking"],
    ),
    (
        "leisure",
        &["leisure", "entertainment", "cinema", "movie", "concert", "streaming"],
    ),
    (
        "subscription",
        &["subscription", "netflix", "spotify", "amazon prime", "disney+", "youtube premium"],
    ),
    (
        "health",
        &["health", "pharmacy", "doctor", "hospital", "clinic", "dentist", "medicine"],
    ),
];

/// Keywords searched in descriptions when no category matches the budget.
pub fn budget_keywords(budget_name: &str) -> Vec<String> {
    let name = budget_name.trim().to_lowercase();
    let mut keywords: Vec<String> = KEYWORD_FAMILIES
        .iter()
        .filter(|(family, _)| name.contains(family))
        .flat_map(|(_, words)| words.iter().map(|w| w.to_string()))
        .collect();
    if keywords.is_empty() && !name.is_empty() {
        keywords.push(name);
    }
    keywords
}

fn category_matches(category: &str, budget: &str) -> bool {
    let category = category.to_lowercase();
    let budget = budget.trim().to_lowercase();
    !category.is_empty() && (category.contains(&budget) || budget.contains(&category))
}

/// Month spend attributed to a budget: expenses in a matching category or,
/// when there are none, the best single keyword hit over descriptions.
pub fn budget_spend(budget_name: &str, expenses: &[(String, Option<String>, i64)]) -> i64 {
    let by_category: i64 = expenses
        .iter()
        .filter(|(_, category, _)| {
            category
                .as_deref()
                .is_some_and(|c| category_matches(c, budget_name))
        })
        .map(|(_, _, amount)| amount)
        .sum();
    if by_category > 0 {
        return by_category;
    }

    budget_keywords(budget_name)
        .iter()
        .map(|keyword| {
            expenses
                .iter()
                .filter(|(description, _, _)| description.to_lowercase().contains(keyword))
                .map(|(_, _, amount)| amount)
                .sum::<i64>()
        })
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent_cents: i64,
    /// Negative when the budget is exceeded.
    pub remaining_cents: i64,
    pub percent_used: f64,
}

impl BudgetStatus {
    fn new(budget: Budget, spent_cents: i64) -> Self {
        let percent_used = if budget.limit_cents > 0 {
            spent_cents as f64 / budget.limit_cents as f64 * 100.0
        } else {
            0.0
        };
        Self {
            remaining_cents: budget.limit_cents - spent_cents,
            budget,
            spent_cents,
            percent_used,
        }
    }
}

/// Every budget of the user with its month spend, most used first.
pub fn budget_status(conn: &Connection, user_id: i64, month: MonthRef) -> AppResult<Vec<BudgetStatus>> {
    let (from, to) = month.range();
    let expenses = reports::expense_lines(conn, user_id, from, to)?;

    let mut statuses: Vec<BudgetStatus> = budgets::list_budgets(conn, user_id)?
        .into_iter()
        .map(|budget| {
            let spent = budget_spend(&budget.name, &expenses);
            BudgetStatus::new(budget, spent)
        })
        .collect();

    statuses.sort_by(|a, b| b.percent_used.total_cmp(&a.percent_used));
    Ok(statuses)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertLevel {
    NearLimit,
    Exceeded,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetAlert {
    pub budget_name: String,
    pub level: AlertLevel,
    pub percent_used: f64,
    pub message: String,
}

/// Budgets at 80% of their limit or more.
pub fn budget_alerts(conn: &Connection, user_id: i64, month: MonthRef) -> AppResult<Vec<BudgetAlert>> {
    Ok(budget_status(conn, user_id, month)?
        .into_iter()
        .filter_map(|status| {
            let level = if status.percent_used >= 100.0 {
                AlertLevel::Exceeded
            } else if status.percent_used >= 80.0 {
                AlertLevel::NearLimit
            } else {
                return None;
            };
            let message = match level {
                AlertLevel::Exceeded => format!(
                    "Budget '{}' exceeded ({:.0}% used)",
                    status.budget.name, status.percent_used
                ),
                AlertLevel::NearLimit => format!(
                    "Budget '{}' is close to its limit ({:.0}% used)",
                    status.budget.name, status.percent_used
                ),
            };
            Some(BudgetAlert {
                budget_name: status.budget.name,
                level,
                percent_used: status.percent_used,
                message,
            })
        })
        .collect())
}

/// Opening balance plus income minus expenses, over the account's whole
/// history.
pub fn account_balance(conn: &Connection, user_id: i64, account_id: i64) -> AppResult<i64> {
    let account = accounts::get_account(conn, user_id, account_id)?
        .ok_or_else(|| AppError::not_found("Account", account_id))?;
    let (income, expense) = reports::account_totals(conn, account_id)?;
    Ok(account.opening_balance_cents + income - expense)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub accounts: i64,
    pub recent_transactions: i64,
    pub active_subscriptions: i64,
    pub categories: i64,
}

/// Counters for the dashboard header; "recent" is the last 30 days.
pub fn dashboard_stats(conn: &Connection, user_id: i64, today: NaiveDate) -> AppResult<DashboardStats> {
    let since = today - Duration::days(30);
    let (_, active_subscriptions) = subscriptions::active_monthly_total(conn, user_id)?;
    Ok(DashboardStats {
        accounts: accounts::count_accounts(conn, user_id)?,
        recent_transactions: reports::count_transactions_since(conn, user_id, since)?,
        active_subscriptions,
        categories: categories::count_categories(conn, user_id)?,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatementFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub transactions: Vec<TransactionWithRelations>,
    pub total_income: i64,
    pub total_expense: i64,
    /// Expense totals by category name.
    pub by_category: Vec<(String, i64)>,
}

/// Transactions in a date range, newest first. Defaults to one month back
/// from `today`.
pub fn statement(
    conn: &Connection,
    user_id: i64,
    filter: &StatementFilter,
    today: NaiveDate,
) -> AppResult<Statement> {
    let to = filter.to.unwrap_or(today);
    let from = filter
        .from
        .unwrap_or_else(|| to.checked_sub_months(Months::new(1)).unwrap_or(to));
    if from > to {
        return Err(AppError::Validation(
            "Statement start date is after its end date".into(),
        ));
    }
    if let Some(account_id) = filter.account_id {
        if accounts::get_account(conn, user_id, account_id)?.is_none() {
            return Err(AppError::not_found("Account", account_id));
        }
    }

    let query = TransactionFilter {
        account_id: filter.account_id,
        ..TransactionFilter::between(from, to)
    };
    let transactions = transactions::list_transactions(conn, user_id, &query)?;

    let mut total_income = 0;
    let mut total_expense = 0;
    let mut by_category: HashMap<String, i64> = HashMap::new();
    for t in &transactions {
        if t.transaction.kind.is_expense() {
            total_expense += t.transaction.amount_cents;
            *by_category
                .entry(t.category_name_or_default().to_string())
                .or_insert(0) += t.transaction.amount_cents;
        } else {
            total_income += t.transaction.amount_cents;
        }
    }
    let mut by_category: Vec<(String, i64)> = by_category.into_iter().collect();
    by_category.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(Statement {
        from,
        to,
        transactions,
        total_income,
        total_expense,
        by_category,
    })
}

/// No accounts and no transactions yet.
pub fn is_new_user(conn: &Connection, user_id: i64) -> AppResult<bool> {
    Ok(accounts::count_accounts(conn, user_id)? == 0
        && !transactions::has_transactions(conn, user_id)?)
}

/// The user still lacks an account or categories.
pub fn needs_initial_setup(conn: &Connection, user_id: i64) -> AppResult<bool> {
    Ok(accounts::count_accounts(conn, user_id)? == 0
        || categories::count_categories(conn, user_id)? == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(description: &str, category: Option<&str>, amount: i64) -> (String, Option<String>, i64) {
        (description.into(), category.map(String::from), amount)
    }

    #[test]
    fn test_keywords_from_family() {
        let keywords = budget_keywords("Monthly Food");
        assert!(keywords.contains(&"restaurant".to_string()));
        assert!(!keywords.contains(&"uber".to_string()));
    }

    #[test]
    fn test_keywords_fall_back_to_name() {
        assert_eq!(budget_keywords("Pets"), vec!["pets".to_string()]);
        assert!(budget_keywords("  ").is_empty());
    }

    #[test]
    fn test_category_match_wins_over_keywords() {
        let expenses = vec![
            line("Weekly shop", Some("Food"), 5000),
            line("Restaurant", None, 9000),
        ];
        assert_eq!(budget_spend("food", &expenses), 5000);
    }

    #[test]
    fn test_category_contained_by_budget_name() {
        let expenses = vec![line("Bus pass", Some("Transport"), 1200)];
        assert_eq!(budget_spend("Public transport", &expenses), 1200);
    }

    #[test]
    fn test_keyword_fallback_takes_best_keyword() {
        let expenses = vec![
            line("Uber to airport", None, 3000),
            line("Uber home", None, 1500),
            line("Fuel", Some("Car"), 4000),
        ];
        assert_eq!(budget_spend("Transport", &expenses), 4500);
    }

    #[test]
    fn test_food_keywords_cover_groceries_and_delivery() {
        let groceries = vec![line("Groceries at the market", None, 4000)];
        assert_eq!(budget_spend("Food", &groceries), 4000);

        let delivery = vec![line("Pizza delivery", None, 2500)];
        assert_eq!(budget_spend("Food", &delivery), 2500);
    }

    #[test]
    fn test_short_words_inside_other_words_do_not_match() {
        let expenses = vec![
            line("Trip to Vegas", None, 50_000),
            line("Barber", None, 3000),
            line("Wall primer", None, 2000),
        ];
        assert_eq!(budget_spend("Transport", &expenses), 0);
        assert_eq!(budget_spend("Leisure", &expenses), 0);
        assert_eq!(budget_spend("Subscriptions", &expenses), 0);

        let fuel = vec![line("Gasoline refill", None, 6000)];
        assert_eq!(budget_spend("Transport", &fuel), 6000);
    }

    #[test]
    fn test_zero_limit_percent_is_zero() {
        let budget = Budget {
            id: 1,
            user_id: 1,
            name: "Food".into(),
            limit_cents: 0,
            created_at: String::new(),
        };
        let status = BudgetStatus::new(budget, 2500);
        assert_eq!(status.percent_used, 0.0);
        assert_eq!(status.remaining_cents, -2500);
    }
}
