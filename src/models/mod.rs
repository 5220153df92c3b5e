pub mod account;
pub mod budget;
pub mod category;
pub mod insight;
pub mod subscription;
pub mod tag;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountKind, AccountWithBalance, NewAccount, DEFAULT_ACCOUNT_BANK};
pub use budget::{Budget, NewBudget};
pub use category::{Category, CategoryKind, NewCategory};
pub use insight::{Insight, DAILY_INSIGHT_TITLE};
pub use subscription::{NewSubscription, Subscription, UpcomingSubscription};
pub use tag::{NewTag, Tag, TagWithUsage};
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionWithRelations};
pub use user::{NewUser, User};
