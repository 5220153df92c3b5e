use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DAILY_INSIGHT_TITLE: &str = "Daily insight";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: String,
    /// Local calendar day the insight belongs to; at most one per user.
    pub generated_on: NaiveDate,
    pub generated_at: String,
}
