//! API request/response models for books on a shelf.

use super::pagination::Pagination;
use crate::db::models::books::{BookDBResponse, BookStatus};
use crate::shelf::{categories::primary_category, sort::SortOrder};
use crate::types::{BookId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BookId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
    pub google_books_id: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Vec<String>,
    /// Genre used for category sorting and spine colouring
    pub primary_category: Option<String>,
    pub status: BookStatus,
    pub rating: Option<i16>,
    pub position: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookDBResponse> for BookResponse {
    fn from(db: BookDBResponse) -> Self {
        let primary_category = primary_category(&db.categories);
        Self {
            id: db.id,
            user_id: db.user_id,
            title: db.title,
            author: db.author,
            isbn13: db.isbn13,
            isbn10: db.isbn10,
            google_books_id: db.google_books_id,
            cover_url: db.cover_url,
            description: db.description,
            page_count: db.page_count,
            published_date: db.published_date,
            publisher: db.publisher,
            categories: db.categories,
            primary_category,
            status: db.status,
            rating: db.rating,
            position: db.position,
            started_at: db.started_at,
            finished_at: db.finished_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Add a book. Only the title is required; `isbn` may be ISBN-10 or ISBN-13 in any common
/// formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BookCreate {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub google_books_id: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Option<Vec<String>>,
    /// Defaults to `want-to-read`
    pub status: Option<BookStatus>,
    pub rating: Option<i16>,
    /// Fill missing metadata from the providers before saving
    #[serde(default)]
    pub autofill: bool,
}

/// Partial book update.
///
/// `rating`, `started_at` and `finished_at` distinguish an omitted field (left alone) from an
/// explicit `null` (cleared). An empty `cover_url` or `description` clears those.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Option<Vec<String>>,
    pub status: Option<BookStatus>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i16>)]
    pub rating: Option<Option<i16>>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub started_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub finished_at: Option<Option<DateTime<Utc>>>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListBooksQuery {
    /// Only books with this reading status
    pub status: Option<BookStatus>,

    /// Shelf ordering; defaults to the reader's saved sort order
    pub sort: Option<SortOrder>,

    /// Seed for `random` ordering; defaults to the reader's saved seed
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub seed: Option<i64>,

    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// Manual shelf order: `book_ids[i]` moves to position `i`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReorderRequest {
    #[schema(value_type = Vec<String>)]
    pub book_ids: Vec<BookId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReorderResponse {
    pub updated: u64,
}

/// Result of a metadata lookup for one book.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrichResponse {
    pub book: BookResponse,
    /// Fields that were empty before and now have a value
    pub filled: Vec<String>,
}

/// Rating must be 1-5 when given.
pub fn validate_rating(rating: Option<i16>) -> Result<(), crate::errors::Error> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(crate::errors::Error::BadRequest {
            message: "Rating must be between 1 and 5".to_string(),
        }),
        _ => Ok(()),
    }
}
