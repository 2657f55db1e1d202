//! API request/response models for likes and comments.

use super::users::UserSummary;
use crate::db::models::engagement::{CommentDBResponse, LikeSummaryDBResponse};
use crate::types::{BookId, CommentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub like_count: i64,
    pub liked: bool,
}

impl From<LikeSummaryDBResponse> for LikeResponse {
    fn from(db: LikeSummaryDBResponse) -> Self {
        Self {
            like_count: db.like_count,
            liked: db.liked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CommentId,
    #[schema(value_type = String, format = "uuid")]
    pub book_id: BookId,
    pub author: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentDBResponse> for CommentResponse {
    fn from(db: CommentDBResponse) -> Self {
        Self {
            id: db.id,
            book_id: db.book_id,
            author: UserSummary {
                id: db.user_id,
                username: db.username,
                display_name: db.display_name,
                avatar_url: db.avatar_url,
            },
            content: db.content,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentCreate {
    pub content: String,
}
