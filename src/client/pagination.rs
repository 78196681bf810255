//! Pagination helpers for marketplace listings

use serde::{Deserialize, Serialize};

/// Maximum page size accepted by the GameMart API.
pub const MAX_PAGE_SIZE: usize = 100;

/// Pagination parameters for listing requests.
///
/// Use the builder pattern to configure options.
///
/// # Example
/// ```ignore
/// let params = PageParams::new().page_size(50).page(2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageParams {
    /// Page number (1-indexed)
    pub page: Option<usize>,
    /// Number of items per page (max: 100)
    pub page_size: Option<usize>,
    /// Sort field name
    pub sort_by: Option<String>,
    /// Sort order
    pub sort_order: Option<SortOrder>,
}

/// Sort order for paginated requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first)
    Asc,
    /// Descending order (Z-A, 9-0, newest first)
    Desc,
}

impl PageParams {
    /// Create new pagination params with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number (1-indexed).
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page size (items per page).
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the sort field.
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    /// Set the sort order.
    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }

    /// Convert to query string parameters.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }

        if let Some(size) = self.page_size {
            params.push(("page_size", size.min(MAX_PAGE_SIZE).to_string()));
        }

        if let Some(ref field) = self.sort_by {
            params.push(("sort_by", field.clone()));
        }

        if let Some(order) = self.sort_order {
            let order_str = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            params.push(("sort_order", order_str.to_string()));
        }

        params
    }

    /// Check if any pagination parameters are set.
    pub fn is_empty(&self) -> bool {
        self.page.is_none()
            && self.page_size.is_none()
            && self.sort_by.is_none()
            && self.sort_order.is_none()
    }
}

/// One page of a listing plus the total count, for computing how many
/// pages remain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    /// The items on this page
    pub items: Vec<T>,

    /// Total number of items across all pages
    #[serde(default)]
    pub total: usize,

    /// Page this response covers (1-indexed)
    #[serde(default = "first_page")]
    pub page: usize,

    /// Items per page the server applied
    #[serde(default)]
    pub page_size: usize,
}

fn first_page() -> usize {
    1
}

impl<T> PagedResponse<T> {
    /// Total number of pages implied by `total` and `page_size`.
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return if self.items.is_empty() { 0 } else { 1 };
        }
        self.total.div_ceil(self.page_size)
    }

    /// Check if pages beyond this one exist.
    pub fn has_more_pages(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Page numbers after this one, for parallel fetching.
    pub fn remaining_pages(&self) -> Vec<usize> {
        ((self.page + 1)..=self.total_pages()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_default() {
        let params = PageParams::new();
        assert!(params.is_empty());
        assert!(params.to_query_params().is_empty());
    }

    #[test]
    fn test_page_params_builder() {
        let params = PageParams::new()
            .page(2)
            .page_size(50)
            .sort_by("price")
            .sort_order(SortOrder::Desc);

        assert!(!params.is_empty());
        let query = params.to_query_params();
        assert!(query.contains(&("page", "2".to_string())));
        assert!(query.contains(&("page_size", "50".to_string())));
        assert!(query.contains(&("sort_by", "price".to_string())));
        assert!(query.contains(&("sort_order", "desc".to_string())));
    }

    #[test]
    fn test_page_size_clamped_to_max() {
        let params = PageParams::new().page_size(5000);
        let query = params.to_query_params();
        assert!(query.contains(&("page_size", MAX_PAGE_SIZE.to_string())));
    }

    #[test]
    fn test_remaining_pages() {
        let response: PagedResponse<u32> = PagedResponse {
            items: vec![1, 2, 3],
            total: 95,
            page: 1,
            page_size: 20,
        };

        assert_eq!(response.total_pages(), 5);
        assert!(response.has_more_pages());
        assert_eq!(response.remaining_pages(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_last_page_has_no_remaining() {
        let response: PagedResponse<u32> = PagedResponse {
            items: vec![1],
            total: 41,
            page: 3,
            page_size: 20,
        };

        assert!(!response.has_more_pages());
        assert!(response.remaining_pages().is_empty());
    }

    #[test]
    fn test_zero_page_size_does_not_divide_by_zero() {
        let response: PagedResponse<u32> = PagedResponse {
            items: vec![],
            total: 0,
            page: 1,
            page_size: 0,
        };

        assert_eq!(response.total_pages(), 0);
        assert!(!response.has_more_pages());
    }
}
