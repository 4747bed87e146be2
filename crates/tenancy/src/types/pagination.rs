//! Offset pagination for paginated reads.

use serde::{Deserialize, Serialize};

/// Default page size when none is given.
pub const DEFAULT_PER_PAGE: u64 = 20;

/// A request for one page of results. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// The 1-based page number.
    #[serde(default = "default_page")]
    pub page: u64,

    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Creates a request for `page` with `per_page` items.
    ///
    /// Page `0` is treated as page `1`, and a page size of `0` as `1`.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Number of matching documents before this page.
    pub fn skip(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }

    /// Maximum number of documents in this page.
    pub fn limit(&self) -> u64 {
        self.per_page.max(1)
    }
}

/// Information about a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Total count of matching documents across all pages.
    pub total: u64,

    /// The 1-based page number.
    pub page: u64,

    /// Page size used for this request.
    pub per_page: u64,

    /// Whether there are more results after this page.
    pub has_next: bool,

    /// Whether there are results before this page.
    pub has_previous: bool,
}

impl PageInfo {
    /// Computes page info for `request` given the total match count.
    pub fn for_request(request: &PageRequest, total: u64) -> Self {
        let end = request.skip().saturating_add(request.limit());
        Self {
            total,
            page: request.page.max(1),
            per_page: request.limit(),
            has_next: end < total,
            has_previous: request.page > 1,
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,

    /// Pagination information.
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a new page with the given items and page info.
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }

    /// Returns true if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}
