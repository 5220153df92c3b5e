use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Bank label given to the placeholder account created by a manual
/// subscription charge when the owner has no account yet.
pub const DEFAULT_ACCOUNT_BANK: &str = "Default account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
    Investment,
    Wallet,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Checking => "Checking",
            AccountKind::Savings => "Savings",
            AccountKind::CreditCard => "CreditCard",
            AccountKind::Investment => "Investment",
            AccountKind::Wallet => "Wallet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Checking" => Some(AccountKind::Checking),
            "Savings" => Some(AccountKind::Savings),
            "CreditCard" => Some(AccountKind::CreditCard),
            "Investment" => Some(AccountKind::Investment),
            "Wallet" => Some(AccountKind::Wallet),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account. The current balance is never stored; see
/// `services::aggregation::account_balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub bank: String,
    pub kind: AccountKind,
    pub opening_balance_cents: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub bank: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

impl NewAccount {
    pub fn placeholder() -> Self {
        Self {
            bank: DEFAULT_ACCOUNT_BANK.to_string(),
            kind: AccountKind::Checking,
            opening_balance_cents: 0,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let bank = self.bank.trim();
        if bank.is_empty() {
            return Err(AppError::Validation("Bank name is required".into()));
        }
        if bank.chars().count() > 50 {
            return Err(AppError::Validation(
                "Bank name must be at most 50 characters".into(),
            ));
        }
        Ok(())
    }
}

/// Account together with its derived current balance.
#[derive(Debug, Clone, Serialize)]
pub struct AccountWithBalance {
    #[serde(flatten)]
    pub account: Account,
    pub balance_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            AccountKind::Checking,
            AccountKind::Savings,
            AccountKind::CreditCard,
            AccountKind::Investment,
            AccountKind::Wallet,
        ] {
            assert_eq!(AccountKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AccountKind::parse("Brokerage"), None);
    }

    #[test]
    fn test_validate_bank_name() {
        assert!(NewAccount::placeholder().validate().is_ok());
        let blank = NewAccount {
            bank: "   ".into(),
            kind: AccountKind::Savings,
            opening_balance_cents: 0,
        };
        assert!(blank.validate().is_err());
    }
}
