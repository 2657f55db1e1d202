//! Shared pagination types for API query parameters.
//!
//! Every list endpoint uses offset-based pagination with `skip` and `limit`.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of items that can be requested per page. A shelf rarely holds more than a few
/// hundred books, so this keeps a whole shelf within a handful of pages.
pub const MAX_LIMIT: i64 = 200;

/// Standard pagination parameters.
///
/// - `skip`: Number of items to skip (default: 0)
/// - `limit`: Maximum items to return (default: 20, max: 200)
///
/// Values arrive as strings when the struct is flattened into another query type, hence
/// `DisplayFromStr`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 20, max: 200)
    #[param(default = 20, minimum = 1, maximum = 200)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Pagination {
    /// Get the skip value, defaulting to 0 if not specified.
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Get both skip and limit as a tuple, useful for destructuring.
    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }

    /// Cut one page out of an already ordered, fully loaded list.
    pub fn page_of<T>(&self, items: Vec<T>) -> Vec<T> {
        let (skip, limit) = self.params();
        items.into_iter().skip(skip as usize).take(limit as usize).collect()
    }
}

/// Paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    /// Number of items skipped
    pub skip: i64,
    /// Maximum items returned per page
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let p = Pagination::default();
        assert_eq!(p.skip(), 0);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_clamping() {
        let p = Pagination {
            skip: None,
            limit: Some(0),
        };
        assert_eq!(p.limit(), 1);

        let p = Pagination {
            skip: Some(-10),
            limit: Some(5000),
        };
        assert_eq!(p.params(), (0, MAX_LIMIT));
    }

    #[test]
    fn test_page_of() {
        let p = Pagination {
            skip: Some(2),
            limit: Some(2),
        };
        assert_eq!(p.page_of(vec![1, 2, 3, 4, 5]), vec![3, 4]);

        let past_end = Pagination {
            skip: Some(10),
            limit: None,
        };
        assert!(past_end.page_of(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn test_deserializes_from_query_strings() {
        let uri: axum::http::Uri = "/books?skip=5&limit=7".parse().unwrap();
        let axum::extract::Query(p) = axum::extract::Query::<Pagination>::try_from_uri(&uri).unwrap();
        assert_eq!(p.params(), (5, 7));
    }
}
