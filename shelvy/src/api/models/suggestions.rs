//! API request/response models for club reading suggestions.

use super::users::UserSummary;
use crate::db::models::suggestions::SuggestionDBResponse;
use crate::types::{ClubId, SuggestionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuggestionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SuggestionId,
    #[schema(value_type = String, format = "uuid")]
    pub club_id: ClubId,
    pub suggested_by: UserSummary,
    pub title: String,
    pub author: String,
    pub isbn13: Option<String>,
    pub cover_url: Option<String>,
    pub reason: Option<String>,
    pub vote_count: i64,
    /// Whether the caller voted for this suggestion
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SuggestionDBResponse> for SuggestionResponse {
    fn from(db: SuggestionDBResponse) -> Self {
        Self {
            id: db.id,
            club_id: db.club_id,
            suggested_by: UserSummary {
                id: db.suggested_by,
                username: db.suggester_username,
                display_name: db.suggester_display_name,
                avatar_url: db.suggester_avatar_url,
            },
            title: db.title,
            author: db.author,
            isbn13: db.isbn13,
            cover_url: db.cover_url,
            reason: db.reason,
            vote_count: db.vote_count,
            has_voted: db.has_voted,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuggestionCreate {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    /// Why the club should read it
    pub reason: Option<String>,
}
