use super::types::{PageRef, Pagination};

/// One page of a listing: 1-based page number and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Inputs are read up to their first non-digit. Non-numeric, zero or
    /// negative inputs fall back to page 1 and `default_limit`; the limit is
    /// then capped at `max_limit`.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, default_limit: i64, max_limit: Option<i64>) -> Self {
        let page = Self::positive(page).unwrap_or(1);
        let mut limit = Self::positive(limit).unwrap_or(default_limit.max(1));
        if let Some(max) = max_limit.filter(|m| *m > 0) {
            limit = limit.min(max);
        }
        Self { page, limit }
    }

    /// Leading integer of the value (`"2.5"` is 2, `"3abc"` is 3), if positive
    fn positive(value: Option<&str>) -> Option<i64> {
        let value = value?.trim_start();
        let (negative, rest) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let number = rest[..end].parse::<i64>().ok()?;
        (!negative && number > 0).then_some(number)
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Links for the neighbouring pages. An empty page links nowhere, even
    /// when earlier pages exist.
    pub fn pagination(&self, total: i64, returned: usize) -> Pagination {
        if returned == 0 {
            return Pagination::default();
        }

        let mut pagination = Pagination::default();
        if self.page.saturating_mul(self.limit) < total {
            pagination.next = Some(PageRef { page: self.page + 1, limit: self.limit });
        }
        if self.skip() > 0 {
            pagination.prev = Some(PageRef { page: self.page - 1, limit: self.limit });
        }
        pagination
    }
}
