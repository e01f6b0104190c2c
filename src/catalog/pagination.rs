//! Page arithmetic over filtered result sets.
//!
//! Everything here is pure integer math over counts; the repository only
//! receives the resulting `limit` and `offset`.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Fixed number of books per page
pub const PAGE_SIZE: i64 = 20;

/// `ceil(total / page_size)`, zero when there is nothing to show
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// A requested page, already clamped to `>= 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Missing or `< 1` pages fall back to page 1 rather than failing,
    /// so hand-edited URLs still land somewhere sensible.
    pub fn new(page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: PAGE_SIZE,
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Navigation metadata for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageInfo {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Books per page
    pub per_page: i64,
    /// Number of books matching the filter, over all pages
    pub total: i64,
    /// Number of pages; 0 when nothing matches
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageInfo {
    /// A page past the end is not an error: the caller gets an empty page and
    /// the real `total_pages` to clamp its navigation against.
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = total_pages(total, request.limit());
        Self {
            page: request.page(),
            per_page: request.limit(),
            total,
            total_pages,
            has_previous: request.page() > 1 && total_pages > 0,
            has_next: request.page() < total_pages,
        }
    }

    pub fn is_past_end(&self) -> bool {
        self.page > self.total_pages
    }
}

/// One page of results together with its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Paginated<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            info: self.info,
        }
    }
}

/// Deserialize a page number from a query string, treating anything that is
/// not an integer as absent.
pub fn lenient_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}
