//! API request/response models for readers, profiles and follows.

use super::pagination::Pagination;
use crate::db::models::follows::{FollowDBResponse, ProfileCountsDBResponse};
use crate::db::models::users::UserDBResponse;
use crate::errors::Error;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The authenticated caller, as carried in the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// Full account details, only ever returned to the account owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            display_name: db.display_name,
            avatar_url: db.avatar_url,
            bio: db.bio,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<UserResponse> for CurrentUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Public face of a reader: what other readers see next to books, comments and clubs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserDBResponse> for UserSummary {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            username: db.username,
            display_name: db.display_name,
            avatar_url: db.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileCounts {
    pub reading: i64,
    pub want_to_read: i64,
    pub read: i64,
    pub followers: i64,
    pub following: i64,
}

impl From<ProfileCountsDBResponse> for ProfileCounts {
    fn from(db: ProfileCountsDBResponse) -> Self {
        Self {
            reading: db.reading_count,
            want_to_read: db.want_to_read_count,
            read: db.read_count,
            followers: db.followers_count,
            following: db.following_count,
        }
    }
}

/// A reader's public profile page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub counts: ProfileCounts,
    /// Whether the caller follows this reader
    pub is_following: bool,
    /// Whether this profile is the caller's own
    pub is_self: bool,
    /// Whether the caller may see this reader's books
    pub can_view_shelf: bool,
}

impl ProfileResponse {
    pub fn new(user: UserDBResponse, counts: ProfileCounts, is_following: bool, is_self: bool, can_view_shelf: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
            created_at: user.created_at,
            counts,
            is_following,
            is_self,
            can_view_shelf,
        }
    }
}

/// Profile edits. Omitted fields are left alone; an empty string clears display name, avatar or bio.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SearchUsersQuery {
    /// Case-insensitive substring of a username or display name
    pub q: String,

    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// One end of a follow relationship.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FollowResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub followed_at: DateTime<Utc>,
}

impl From<FollowDBResponse> for FollowResponse {
    fn from(db: FollowDBResponse) -> Self {
        Self {
            id: db.user_id,
            username: db.username,
            display_name: db.display_name,
            avatar_url: db.avatar_url,
            followed_at: db.followed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FollowStatusResponse {
    pub following: bool,
}

/// Lower-case a username and check it is 3-30 characters of `a-z`, `0-9` and `_`.
pub fn normalize_username(raw: &str) -> Result<String, Error> {
    let username = raw.trim().to_lowercase();
    let valid_chars = username.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !(3..=30).contains(&username.len()) || !valid_chars {
        return Err(Error::BadRequest {
            message: "Usernames must be 3-30 characters of letters, digits and underscores".to_string(),
        });
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Book_Worm42 ").unwrap(), "book_worm42");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("émile").is_err());
        assert!(normalize_username(&"a".repeat(31)).is_err());
    }
}
