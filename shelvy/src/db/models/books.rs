//! Database models for books on a reader's shelf.

use crate::shelf::sort::ShelfItem;
use crate::types::{BookId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "book_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    Reading,
    WantToRead,
    Read,
}

/// Reading dates after moving a book to `next`.
///
/// - moving to `reading` stamps `started_at` if it was never set and keeps `finished_at`
/// - moving to `read` stamps `finished_at` (and `started_at` if missing)
/// - moving back to `want-to-read` clears both
///
/// Re-applying the current status leaves the dates untouched.
pub fn reading_dates_after(
    current: BookStatus,
    next: BookStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    if current == next {
        return (started_at, finished_at);
    }
    match next {
        BookStatus::Reading => (started_at.or(Some(now)), finished_at),
        BookStatus::Read => (started_at.or(Some(now)), Some(now)),
        BookStatus::WantToRead => (None, None),
    }
}

/// Database request for creating a book
#[derive(Debug, Clone)]
pub struct BookCreateDBRequest {
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
    pub status: BookStatus,
    pub rating: Option<i16>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the book was already enriched at creation time
    pub metadata_attempted: bool,
}

/// Database request for updating a book. `None` leaves the column unchanged.
///
/// The doubly-optional fields distinguish "leave alone" (`None`) from "set to NULL" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct BookUpdateDBRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Option<Vec<String>>,
    pub status: Option<BookStatus>,
    pub rating: Option<Option<i16>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub finished_at: Option<Option<DateTime<Utc>>>,
}

/// Metadata found for a book. Applied only to columns that are currently empty.
#[derive(Debug, Clone, Default)]
pub struct BookMetadataFill {
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
    pub google_books_id: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Vec<String>,
}

/// Database response for a book
#[derive(Debug, Clone, FromRow)]
pub struct BookDBResponse {
    pub id: BookId,
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
    pub status: BookStatus,
    pub rating: Option<i16>,
    pub position: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub metadata_attempted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookDBResponse {
    /// Names of enrichable fields that are still empty.
    pub fn missing_metadata(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.cover_url.is_none() {
            missing.push("cover_url");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        if self.page_count.is_none() {
            missing.push("page_count");
        }
        if self.categories.is_empty() {
            missing.push("categories");
        }
        if self.published_date.is_none() {
            missing.push("published_date");
        }
        if self.publisher.is_none() {
            missing.push("publisher");
        }
        missing
    }
}

impl ShelfItem for BookDBResponse {
    fn title(&self) -> &str {
        &self.title
    }
    fn author(&self) -> &str {
        &self.author
    }
    fn categories(&self) -> &[String] {
        &self.categories
    }
    fn position(&self) -> i32 {
        self.position
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A book joined with its owner, for the activity feed.
#[derive(Debug, Clone, FromRow)]
pub struct FeedEntryDBResponse {
    #[sqlx(flatten)]
    pub book: BookDBResponse,
    pub owner_username: String,
    pub owner_display_name: Option<String>,
    pub owner_avatar_url: Option<String>,
}
