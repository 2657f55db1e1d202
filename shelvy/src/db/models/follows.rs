//! Database models for the follow graph.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Public profile fields of a reader on the other end of a follow.
#[derive(Debug, Clone, FromRow)]
pub struct FollowDBResponse {
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub followed_at: DateTime<Utc>,
}

/// Aggregates shown on a profile page.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ProfileCountsDBResponse {
    pub reading_count: i64,
    pub want_to_read_count: i64,
    pub read_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}
