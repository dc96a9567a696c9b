//! Limit/offset paging for list endpoints

use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};

const MAX_OFFSET: u64 = i64::MAX as u64;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PageParams {
    /// Effective (limit, offset), clamped to the configured bounds.
    /// Offsets stop at `i64::MAX`, the largest value SQL accepts.
    pub fn resolve(&self, config: &PaginationConfig) -> (u64, u64) {
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(config.default_limit)
            .min(config.max_limit.max(1));
        let offset = self.offset.unwrap_or(0).min(MAX_OFFSET);
        (limit, offset)
    }
}

/// One page of a list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    /// Offset of the following page
    pub next: Option<u64>,
    /// Offset of the preceding page
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, limit: u64, offset: u64) -> Self {
        let end = offset.saturating_add(limit);
        let next = (end < count).then_some(end);
        let previous = (offset > 0).then(|| offset.saturating_sub(limit));
        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
