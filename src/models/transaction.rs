use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::tag::Tag;

/// Income and expense share one identity space and one table. Only the
/// expense variant can carry a category or a generating subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense {
        category_id: Option<i64>,
        subscription_id: Option<i64>,
    },
}

impl TransactionKind {
    pub fn expense(category_id: Option<i64>) -> Self {
        TransactionKind::Expense {
            category_id,
            subscription_id: None,
        }
    }

    /// Discriminator value stored in `transactions.kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense { .. } => "expense",
        }
    }

    /// Rebuild from the stored columns. The table's CHECK constraint keeps
    /// income rows free of category and subscription references.
    pub fn from_columns(kind: &str, category_id: Option<i64>, subscription_id: Option<i64>) -> Self {
        if kind == "income" {
            TransactionKind::Income
        } else {
            TransactionKind::Expense {
                category_id,
                subscription_id,
            }
        }
    }

    pub fn is_expense(&self) -> bool {
        matches!(self, TransactionKind::Expense { .. })
    }

    pub fn category_id(&self) -> Option<i64> {
        match self {
            TransactionKind::Income => None,
            TransactionKind::Expense { category_id, .. } => *category_id,
        }
    }

    pub fn subscription_id(&self) -> Option<i64> {
        match self {
            TransactionKind::Income => None,
            TransactionKind::Expense {
                subscription_id, ..
            } => *subscription_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    /// Always positive; the kind decides the direction.
    pub amount_cents: i64,
    pub description: String,
    pub kind: TransactionKind,
    pub created_at: String,
}

impl Transaction {
    /// Effect of this transaction on its account balance.
    pub fn signed_cents(&self) -> i64 {
        match self.kind {
            TransactionKind::Income => self.amount_cents,
            TransactionKind::Expense { .. } => -self.amount_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionWithRelations {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub account_bank: String,
    pub category_name: Option<String>,
    pub tags: Vec<Tag>,
}

impl TransactionWithRelations {
    pub fn category_name_or_default(&self) -> &str {
        self.category_name.as_deref().unwrap_or("Uncategorized")
    }

    pub fn has_tag(&self, id: i64) -> bool {
        self.tags.iter().any(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub kind: TransactionKind,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl NewTransaction {
    pub fn income(account_id: i64, date: NaiveDate, amount_cents: i64, description: &str) -> Self {
        Self {
            account_id,
            date,
            amount_cents,
            description: description.to_string(),
            kind: TransactionKind::Income,
            tag_ids: Vec::new(),
        }
    }

    pub fn expense(
        account_id: i64,
        date: NaiveDate,
        amount_cents: i64,
        description: &str,
        category_id: Option<i64>,
    ) -> Self {
        Self {
            account_id,
            date,
            amount_cents,
            description: description.to_string(),
            kind: TransactionKind::expense(category_id),
            tag_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.amount_cents <= 0 {
            return Err(AppError::Validation("Amount must be positive".into()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_income_has_no_category_or_subscription() {
        let kind = TransactionKind::from_columns("income", Some(3), Some(4));
        assert_eq!(kind, TransactionKind::Income);
        assert_eq!(kind.category_id(), None);
        assert_eq!(kind.subscription_id(), None);
    }

    #[test]
    fn test_expense_keeps_references() {
        let kind = TransactionKind::from_columns("expense", Some(3), Some(4));
        assert_eq!(kind.category_id(), Some(3));
        assert_eq!(kind.subscription_id(), Some(4));
        assert_eq!(kind.as_str(), "expense");
    }

    #[test]
    fn test_signed_cents() {
        let mut tx = Transaction {
            id: 1,
            account_id: 1,
            date: today(),
            amount_cents: 2500,
            description: "Salary".into(),
            kind: TransactionKind::Income,
            created_at: String::new(),
        };
        assert_eq!(tx.signed_cents(), 2500);
        tx.kind = TransactionKind::expense(None);
        assert_eq!(tx.signed_cents(), -2500);
    }

    #[test]
    fn test_validate_rejects_non_positive_amounts() {
        assert!(NewTransaction::income(1, today(), 0, "Zero").validate().is_err());
        assert!(NewTransaction::expense(1, today(), -5, "Neg", None)
            .validate()
            .is_err());
        assert!(NewTransaction::expense(1, today(), 500, " ", None)
            .validate()
            .is_err());
        assert!(NewTransaction::income(1, today(), 500, "Gift").validate().is_ok());
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let json = serde_json::to_string(&TransactionKind::expense(Some(2))).unwrap();
        assert_eq!(
            json,
            r#"{"type":"expense","category_id":2,"subscription_id":null}"#
        );
    }
}
