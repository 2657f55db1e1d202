//! Database models for reading notes.

use crate::types::{BookId, NoteId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct NoteCreateDBRequest {
    pub book_id: BookId,
    pub user_id: UserId,
    pub content: String,
    pub page: Option<i32>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NoteUpdateDBRequest {
    pub content: Option<String>,
    pub page: Option<Option<i32>>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NoteDBResponse {
    pub id: NoteId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub content: String,
    pub page: Option<i32>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
