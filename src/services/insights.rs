//! Daily one-paragraph summaries of a user's month.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;
use tracing::debug;

use crate::date_utils::MonthRef;
use crate::db::queries::insights;
use crate::error::AppResult;
use crate::filters::MoneyFormat;
use crate::models::{Insight, DAILY_INSIGHT_TITLE};
use crate::services::{aggregation, recurring};

/// Shown when the month has nothing worth commenting on.
pub const GENERIC_TIPS: [&str; 5] = [
    "Record all your expenses to keep better control of your finances.",
    "Set monthly budgets for each spending category.",
    "Put aside at least 10% of your income for emergencies.",
    "Review your subscriptions every month and cancel the ones you don't use.",
    "Compare prices before making important purchases.",
];

/// Subscriptions above this share of monthly income trigger a warning.
const SUBSCRIPTION_INCOME_SHARE: f64 = 0.3;

/// Builds the insight text for the month containing `today`.
pub fn generate_daily_insight<R: Rng + ?Sized>(
    conn: &Connection,
    user_id: i64,
    today: NaiveDate,
    money: &MoneyFormat,
    rng: &mut R,
) -> AppResult<String> {
    let month = MonthRef::containing(today);
    let summary = aggregation::monthly_summary(conn, user_id, month)?;
    let mut sentences: Vec<String> = Vec::new();

    if summary.balance > 0 {
        sentences.push(format!(
            "Great job! You have a positive balance of {} this month.",
            money.amount(summary.balance)
        ));
    } else if summary.balance < 0 {
        sentences.push(format!(
            "Heads up! You have a negative balance of {} this month. Consider reviewing your spending.",
            money.amount(summary.balance)
        ));
    }

    // Only a real category is worth naming; an uncategorized top bucket is skipped.
    if let Some(top) = aggregation::category_spend(conn, user_id, month)?.first() {
        if top.category_id.is_some() {
            sentences.push(format!(
                "Your biggest spending category is '{}' with {} this month.",
                top.category,
                money.amount(top.total_cents)
            ));
        }
    }

    let subscriptions = recurring::monthly_subscription_total(conn, user_id)?;
    if subscriptions.active_count > 0 {
        let noun = if subscriptions.active_count == 1 {
            "subscription"
        } else {
            "subscriptions"
        };
        sentences.push(format!(
            "You spend {} monthly on {} active {}.",
            money.amount(subscriptions.monthly_cents),
            subscriptions.active_count,
            noun
        ));
        if subscriptions.monthly_cents as f64
            > summary.total_income as f64 * SUBSCRIPTION_INCOME_SHARE
        {
            sentences.push(
                "Your subscriptions take more than 30% of your income. Consider cancelling the ones you don't use."
                    .to_string(),
            );
        }
    }

    if sentences.is_empty() {
        if let Some(tip) = GENERIC_TIPS.choose(rng) {
            sentences.push(tip.to_string());
        }
    }

    debug!(user_id, sentences = sentences.len(), "Generated insight");
    Ok(sentences.join(" "))
}

/// Stores `text` as the user's insight for `today`. Returns false, keeping
/// the earlier row, when one was already stored today.
pub fn save_insight(conn: &Connection, user_id: i64, text: &str, today: NaiveDate) -> AppResult<bool> {
    if insights::insight_for_day(conn, user_id, today)?.is_some() {
        debug!(user_id, %today, "Insight already stored today");
        return Ok(false);
    }
    insights::create_insight(conn, user_id, DAILY_INSIGHT_TITLE, text, today)?;
    Ok(true)
}

pub const PROMPT_GENERATE: &str = "Generate your first insight to see a summary of your month.";
pub const PROMPT_ADD_DATA: &str = "Add an account and some transactions to receive daily insights.";

/// Text for the dashboard insight card.
pub fn dashboard_insight(conn: &Connection, user_id: i64, today: NaiveDate) -> AppResult<String> {
    if let Some(insight) = insights::insight_for_day(conn, user_id, today)? {
        return Ok(insight.body);
    }
    if let Some(Insight {
        body, generated_on, ..
    }) = insights::latest_insight(conn, user_id)?
    {
        return Ok(format!(
            "Last insight ({}): {}",
            generated_on.format("%d/%m"),
            body
        ));
    }
    if aggregation::is_new_user(conn, user_id)? {
        Ok(PROMPT_ADD_DATA.to_string())
    } else {
        Ok(PROMPT_GENERATE.to_string())
    }
}

pub fn recent_insights(conn: &Connection, user_id: i64, limit: i64) -> AppResult<Vec<Insight>> {
    Ok(insights::list_insights(conn, user_id, limit)?)
}
