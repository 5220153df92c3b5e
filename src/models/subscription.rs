use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_utils::{add_months, months_between};
use crate::error::{AppError, AppResult};

/// A recurring monthly charge template.
///
/// Billing cycles fall on `start_date + k months` (k >= 0), always computed
/// from the start date so a 31st keeps coming back after short months. The
/// due date is derived from the cycle and the last generated charge; it is
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub service: String,
    pub monthly_amount_cents: i64,
    pub account_id: Option<i64>,
    pub active: bool,
    pub start_date: NaiveDate,
    pub created_at: String,
}

impl Subscription {
    /// The most recent cycle date on or before `today`, with its index.
    /// `None` while the subscription has not started.
    fn current_cycle(&self, today: NaiveDate) -> Option<(u32, NaiveDate)> {
        if self.start_date > today {
            return None;
        }
        let mut k = months_between(self.start_date, today).max(0) as u32;
        loop {
            let cycle = add_months(self.start_date, k)?;
            if cycle <= today || k == 0 {
                return Some((k, cycle));
            }
            k -= 1;
        }
    }

    /// Next date on which a charge should be materialized.
    ///
    /// The current cycle date stays due (even if it already passed) until a
    /// generated charge dated on or after it exists; after that the next
    /// cycle date is returned.
    pub fn next_due_date(&self, last_charge: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
        match self.current_cycle(today) {
            None => self.start_date,
            Some((k, cycle)) => {
                let charged = last_charge.is_some_and(|last| last >= cycle);
                if charged {
                    add_months(self.start_date, k + 1).unwrap_or(NaiveDate::MAX)
                } else {
                    cycle
                }
            }
        }
    }

    pub fn is_due(&self, last_charge: Option<NaiveDate>, today: NaiveDate) -> bool {
        self.active && self.next_due_date(last_charge, today) <= today
    }

    pub fn annual_cost_cents(&self) -> i64 {
        self.monthly_amount_cents * 12
    }

    pub fn charge_description(&self) -> String {
        format!("Subscription - {} (auto)", self.service)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscription {
    pub service: String,
    pub monthly_amount_cents: i64,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub start_date: NaiveDate,
}

fn default_active() -> bool {
    true
}

impl NewSubscription {
    pub fn validate(&self) -> AppResult<()> {
        if self.service.trim().is_empty() {
            return Err(AppError::Validation("Service name is required".into()));
        }
        if self.monthly_amount_cents <= 0 {
            return Err(AppError::Validation(
                "Monthly amount must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Active subscription with its derived due date, for dashboard listings.
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingSubscription {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub next_due_date: NaiveDate,
}
