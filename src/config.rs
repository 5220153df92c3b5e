use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::filters::MoneyFormat;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub currency: String,
    pub locale: String,
    /// Pause between successful daily job runs.
    pub run_interval: Duration,
    /// Pause before retrying after a failed run.
    pub retry_interval: Duration,
}

const HOUR: u64 = 60 * 60;

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_path: env::var("LEDGERDESK_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/ledgerdesk.db")),
            migrations_path: env::var("LEDGERDESK_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            currency: env::var("LEDGERDESK_CURRENCY").unwrap_or_else(|_| "USD".into()),
            locale: env::var("LEDGERDESK_LOCALE").unwrap_or_else(|_| "en-US".into()),
            run_interval: hours_from_env("LEDGERDESK_RUN_INTERVAL_HOURS", 24),
            retry_interval: hours_from_env("LEDGERDESK_RETRY_INTERVAL_HOURS", 1),
        }
    }

    pub fn money_format(&self) -> MoneyFormat {
        MoneyFormat::new(&self.currency, &self.locale)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/ledgerdesk.db"),
            migrations_path: PathBuf::from("migrations"),
            currency: "USD".into(),
            locale: "en-US".into(),
            run_interval: Duration::from_secs(24 * HOUR),
            retry_interval: Duration::from_secs(HOUR),
        }
    }
}

fn hours_from_env(key: &str, default_hours: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|h| *h > 0)
        .and_then(|h| h.checked_mul(HOUR))
        .unwrap_or(default_hours * HOUR);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_from_env_falls_back() {
        assert_eq!(
            hours_from_env("LEDGERDESK_TEST_UNSET_HOURS", 24),
            Duration::from_secs(24 * HOUR)
        );

        env::set_var("LEDGERDESK_TEST_ZERO_HOURS", "0");
        assert_eq!(
            hours_from_env("LEDGERDESK_TEST_ZERO_HOURS", 1),
            Duration::from_secs(HOUR)
        );

        env::set_var("LEDGERDESK_TEST_BAD_HOURS", "soon");
        assert_eq!(
            hours_from_env("LEDGERDESK_TEST_BAD_HOURS", 1),
            Duration::from_secs(HOUR)
        );

        env::set_var("LEDGERDESK_TEST_SIX_HOURS", "6");
        assert_eq!(
            hours_from_env("LEDGERDESK_TEST_SIX_HOURS", 1),
            Duration::from_secs(6 * HOUR)
        );
    }

    #[test]
    fn test_hours_from_env_overflow_uses_default() {
        env::set_var("LEDGERDESK_TEST_HUGE_HOURS", "6000000000000000");
        assert_eq!(
            hours_from_env("LEDGERDESK_TEST_HUGE_HOURS", 24),
            Duration::from_secs(24 * HOUR)
        );
    }

    #[test]
    fn test_default_money_format() {
        assert_eq!(Config::default().money_format(), MoneyFormat::default());
    }
}
