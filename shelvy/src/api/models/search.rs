//! Query parameters for book metadata search.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 40;

#[serde_as]
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SearchBooksQuery {
    /// Free text: title, author, or both
    pub q: String,

    /// Maximum results (default 10, max 40)
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchBooksQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT)
    }
}
