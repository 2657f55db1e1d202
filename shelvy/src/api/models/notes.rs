//! API request/response models for reading notes.

use crate::db::models::notes::NoteDBResponse;
use crate::types::{BookId, NoteId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NoteId,
    #[schema(value_type = String, format = "uuid")]
    pub book_id: BookId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub content: String,
    pub page: Option<i32>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteDBResponse> for NoteResponse {
    fn from(db: NoteDBResponse) -> Self {
        Self {
            id: db.id,
            book_id: db.book_id,
            user_id: db.user_id,
            content: db.content,
            page: db.page,
            is_private: db.is_private,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteCreate {
    pub content: String,
    pub page: Option<i32>,
    #[serde(default)]
    pub is_private: bool,
}

/// `page: null` removes the page reference; omitting it leaves it alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteUpdate {
    pub content: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub page: Option<Option<i32>>,
    pub is_private: Option<bool>,
}
