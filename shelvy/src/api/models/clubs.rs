//! API request/response models for book clubs.

use crate::db::models::clubs::{ClubDBResponse, ClubInviteDBResponse, ClubMemberDBResponse, ClubRole};
use crate::types::{ClubId, InviteId, SuggestionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The book a club is currently reading.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentBook {
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub suggestion_id: Option<SuggestionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClubResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ClubId,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub invite_code: String,
    pub current_book: Option<CurrentBook>,
    pub member_count: i64,
    /// The caller's role in this club
    pub my_role: Option<ClubRole>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClubDBResponse> for ClubResponse {
    fn from(db: ClubDBResponse) -> Self {
        let current_book = db.current_book_title.map(|title| CurrentBook {
            title,
            author: db.current_book_author,
            cover_url: db.current_book_cover_url,
            suggestion_id: db.current_suggestion_id,
        });
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            owner_id: db.owner_id,
            invite_code: db.invite_code,
            current_book,
            member_count: db.member_count,
            my_role: None,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl ClubResponse {
    pub fn with_role(mut self, role: Option<ClubRole>) -> Self {
        self.my_role = role;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClubCreate {
    pub name: String,
    pub description: Option<String>,
}

/// An empty description clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ClubUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinClubRequest {
    pub invite_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClubMemberResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ClubRole,
    pub joined_at: DateTime<Utc>,
}

impl From<ClubMemberDBResponse> for ClubMemberResponse {
    fn from(db: ClubMemberDBResponse) -> Self {
        Self {
            user_id: db.user_id,
            username: db.username,
            display_name: db.display_name,
            avatar_url: db.avatar_url,
            role: db.role,
            joined_at: db.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberRoleUpdate {
    pub role: ClubRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteCreate {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InviteId,
    #[schema(value_type = String, format = "uuid")]
    pub club_id: ClubId,
    pub email: String,
    #[schema(value_type = String, format = "uuid")]
    pub invited_by: UserId,
    pub invite_url: String,
    pub created_at: DateTime<Utc>,
}

impl InviteResponse {
    pub fn new(db: ClubInviteDBResponse, invite_url: String) -> Self {
        Self {
            id: db.id,
            club_id: db.club_id,
            email: db.email,
            invited_by: db.invited_by,
            invite_url,
            created_at: db.created_at,
        }
    }
}
