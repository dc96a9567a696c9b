//! YaMDb Common Library
//!
//! Shared code for the YaMDb services including:
//! - Database entities and the repository
//! - Error types and handling
//! - Configuration management
//! - Authentication (access tokens, signup confirmation codes)
//! - Access rules
//! - Payload field validators
//! - Outbound mail
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod permissions;
pub mod validation;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use mail::Mailer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
