//! Database models for book clubs, memberships and invites.

use crate::types::{ClubId, InviteId, SuggestionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A member's role within one club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "club_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClubRole {
    Owner,
    Admin,
    Member,
}

impl ClubRole {
    /// Owners and admins moderate the club: edit details, remove members, pick the current book.
    pub fn can_manage(self) -> bool {
        matches!(self, ClubRole::Owner | ClubRole::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct ClubCreateDBRequest {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub invite_code: String,
}

/// `None` leaves the column unchanged; an empty description clears it.
#[derive(Debug, Clone, Default)]
pub struct ClubUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// The club's current read, copied from the selected suggestion.
#[derive(Debug, Clone)]
pub struct CurrentBookDBRequest {
    pub suggestion_id: SuggestionId,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
}

/// Club row plus the aggregates every listing needs.
#[derive(Debug, Clone, FromRow)]
pub struct ClubDBResponse {
    pub id: ClubId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub invite_code: String,
    pub current_book_title: Option<String>,
    pub current_book_author: Option<String>,
    pub current_book_cover_url: Option<String>,
    pub current_suggestion_id: Option<SuggestionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub member_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClubMemberDBResponse {
    pub club_id: ClubId,
    pub user_id: UserId,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClubInviteCreateDBRequest {
    pub club_id: ClubId,
    pub email: String,
    pub invited_by: UserId,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClubInviteDBResponse {
    pub id: InviteId,
    pub club_id: ClubId,
    pub email: String,
    pub invited_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_manage() {
        assert!(ClubRole::Owner.can_manage());
        assert!(ClubRole::Admin.can_manage());
        assert!(!ClubRole::Member.can_manage());
    }
}
