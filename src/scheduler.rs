//! Background loop that runs the daily job until shutdown.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::queries::users;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::filters::MoneyFormat;
use crate::services::recurring::{self, RunReport};
use crate::services::insights;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyJobReport {
    pub charges: RunReport,
    pub insights_saved: usize,
    pub insight_failures: usize,
}

/// Materializes due subscription charges, then stores a daily insight for
/// every user. A user whose insight fails is logged and skipped.
pub fn run_daily_job(pool: &DbPool, money: &MoneyFormat, today: NaiveDate) -> AppResult<DailyJobReport> {
    let mut conn = pool.get()?;
    let charges = recurring::materialize_due_charges(&mut conn, today)?;

    let mut report = DailyJobReport {
        charges,
        ..Default::default()
    };
    let mut rng = rand::thread_rng();
    for user_id in users::list_user_ids(&conn)? {
        let saved = insights::generate_daily_insight(&conn, user_id, today, money, &mut rng)
            .and_then(|text| insights::save_insight(&conn, user_id, &text, today));
        match saved {
            Ok(true) => report.insights_saved += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(user_id, error = %e, "Failed to generate daily insight");
                report.insight_failures += 1;
            }
        }
    }

    Ok(report)
}

pub struct Scheduler {
    pool: DbPool,
    money: MoneyFormat,
    run_interval: Duration,
    retry_interval: Duration,
}

impl Scheduler {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self::with_intervals(
            pool,
            config.money_format(),
            config.run_interval,
            config.retry_interval,
        )
    }

    pub fn with_intervals(
        pool: DbPool,
        money: MoneyFormat,
        run_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            pool,
            money,
            run_interval,
            retry_interval,
        }
    }

    /// Runs the daily job, sleeping `run_interval` after a success and
    /// `retry_interval` after a failure, until `shutdown` turns true or its
    /// sender is dropped. Returns how many times the job ran.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(
            run_interval_secs = self.run_interval.as_secs(),
            retry_interval_secs = self.retry_interval.as_secs(),
            "Scheduler started"
        );
        let mut runs = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let pool = self.pool.clone();
            let money = self.money.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                run_daily_job(&pool, &money, Local::now().date_naive())
            })
            .await;
            runs += 1;

            let pause = match outcome {
                Ok(Ok(report)) => {
                    info!(
                        created = report.charges.created,
                        insights_saved = report.insights_saved,
                        "Daily job finished"
                    );
                    self.run_interval
                }
                Ok(Err(e)) => {
                    error!(error = %e, transient = e.is_transient(), "Daily job failed");
                    self.retry_interval
                }
                Err(e) => {
                    error!(error = %e, "Daily job panicked");
                    self.retry_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(runs, "Scheduler stopped");
        runs
    }
}
