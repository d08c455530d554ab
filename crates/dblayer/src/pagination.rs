//! Page-based pagination results.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    /// `ceil(total / per_page)`; zero when there are no rows.
    pub last_page: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub(crate) const fn new(total: u64, per_page: u64, current_page: u64, data: Vec<T>) -> Self {
        Self {
            total,
            per_page,
            current_page,
            last_page: total.div_ceil(per_page),
            data,
        }
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Validates the page request and returns the row offset of `page`.
pub(crate) fn page_offset(page: u64, per_page: u64) -> Result<u64> {
    if page == 0 {
        return Err(Error::invalid("page numbers start at 1"));
    }
    if per_page == 0 {
        return Err(Error::invalid("per_page must be at least 1"));
    }
    (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| Error::invalid("page offset overflows"))
}
