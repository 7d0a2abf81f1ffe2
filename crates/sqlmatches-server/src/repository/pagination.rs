use serde::{Deserialize, Serialize};

/// Largest page a listing returns.
pub const MAX_LIMIT: usize = 100;

/// Offset pagination for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Maximum number of records to return.
    pub limit: usize,
    /// Number of records to skip.
    pub offset: usize,
}

impl OffsetPagination {
    /// Creates a new pagination instance.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }

    /// Creates pagination from a 1-based page number and page size.
    pub fn from_page(page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_LIMIT);
        Self {
            limit: page_size,
            offset: (page - 1) * page_size,
        }
    }

    /// Whether this is the first page.
    #[inline]
    pub fn is_first_page(&self) -> bool {
        self.offset == 0
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self::from_page(1, 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_page_clamps_inputs() {
        let page = OffsetPagination::from_page(0, 500);
        assert_eq!(page.limit, MAX_LIMIT);
        assert_eq!(page.offset, 0);
        assert!(page.is_first_page());

        let page = OffsetPagination::from_page(3, 10);
        assert_eq!(page.offset, 20);
        assert!(!page.is_first_page());
    }
}
