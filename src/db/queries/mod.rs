pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod insights;
pub mod reports;
pub mod subscriptions;
pub mod tags;
pub mod transactions;
pub mod users;
