use serde::Deserialize;

use crate::repository::OffsetPagination;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl From<Pagination> for OffsetPagination {
    fn from(pagination: Pagination) -> Self {
        let default = OffsetPagination::default();
        match (pagination.page, pagination.per_page) {
            (None, None) => default,
            (page, per_page) => {
                OffsetPagination::from_page(page.unwrap_or(1), per_page.unwrap_or(default.limit))
            }
        }
    }
}
