//! Offset pagination for banner listings.

use crate::domain::error::DomainError;

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// A validated `LIMIT`/`OFFSET` pair. Listings are ordered by banner id, so a
/// window always selects the same rows for an unchanged store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    limit: u32,
    offset: u64,
}

impl PageWindow {
    pub fn new(limit: u32, offset: u64) -> Result<Self, DomainError> {
        if limit == 0 {
            return Err(DomainError::validation("limit must be greater than zero"));
        }
        if limit > MAX_PAGE_LIMIT {
            return Err(DomainError::validation(format!(
                "limit must not exceed {MAX_PAGE_LIMIT}"
            )));
        }
        if i64::try_from(offset).is_err() {
            return Err(DomainError::validation("offset exceeds supported range"));
        }
        Ok(Self { limit, offset })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_limit() {
        assert!(PageWindow::new(0, 0).is_err());
    }

    #[test]
    fn rejects_oversized_limit() {
        assert!(PageWindow::new(MAX_PAGE_LIMIT + 1, 0).is_err());
    }

    #[test]
    fn accepts_regular_window() {
        let window = PageWindow::new(10, 20).expect("valid window");
        assert_eq!(window.limit(), 10);
        assert_eq!(window.offset(), 20);
    }
}
