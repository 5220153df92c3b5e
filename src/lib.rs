pub mod auth;
pub mod config;
pub mod date_utils;
pub mod db;
pub mod error;
pub mod filters;
pub mod models;
pub mod scheduler;
pub mod services;

/// Library version from Cargo.toml (single source of truth)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
