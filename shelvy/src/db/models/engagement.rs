//! Database models for likes and comments on books.

use crate::types::{BookId, CommentId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub book_id: BookId,
    pub user_id: UserId,
    pub content: String,
}

/// Comment joined with its author's public profile fields.
#[derive(Debug, Clone, FromRow)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Like tally for one book, from the viewer's point of view.
#[derive(Debug, Clone, FromRow)]
pub struct LikeSummaryDBResponse {
    pub like_count: i64,
    pub liked: bool,
}
