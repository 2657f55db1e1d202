//! Database models for club reading suggestions and votes.

use crate::types::{ClubId, SuggestionId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct SuggestionCreateDBRequest {
    pub club_id: ClubId,
    pub suggested_by: UserId,
    pub title: String,
    pub author: String,
    pub isbn13: Option<String>,
    pub cover_url: Option<String>,
    pub reason: Option<String>,
}

/// Suggestion with its vote tally and whether the viewing reader voted for it.
#[derive(Debug, Clone, FromRow)]
pub struct SuggestionDBResponse {
    pub id: SuggestionId,
    pub club_id: ClubId,
    pub suggested_by: UserId,
    pub title: String,
    pub author: String,
    pub isbn13: Option<String>,
    pub cover_url: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub suggester_username: String,
    pub suggester_display_name: Option<String>,
    pub suggester_avatar_url: Option<String>,
    pub vote_count: i64,
    pub has_voted: bool,
}
