//! Router-wide middleware

pub mod metrics;
pub mod rate_limit;
