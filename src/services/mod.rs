pub mod aggregation;
pub mod insights;
pub mod ledger;
pub mod recurring;
pub mod seed;
