//! API models for shelf settings, sharing, the follow feed and public shelves.

use super::{books::BookResponse, users::UserSummary};
use crate::config::Config;
use crate::db::models::{books::FeedEntryDBResponse, shelf_settings::ShelfSettingsDBResponse};
use crate::shelf::sort::SortOrder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShelfSettingsResponse {
    pub shelf_name: String,
    pub theme: String,
    pub spine_style: String,
    pub sort_order: SortOrder,
    pub random_seed: i32,
    pub show_want_to_read: bool,
    pub is_public: bool,
    pub share_slug: Option<String>,
    /// Present while the shelf is public
    pub share_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ShelfSettingsResponse {
    pub fn from_db(db: ShelfSettingsDBResponse, config: &Config) -> Self {
        let share_url = db.share_slug.as_deref().filter(|_| db.is_public).map(|slug| config.share_url(slug));
        Self {
            shelf_name: db.shelf_name,
            theme: db.theme,
            spine_style: db.spine_style,
            sort_order: db.sort_order,
            random_seed: db.random_seed,
            show_want_to_read: db.show_want_to_read,
            is_public: db.is_public,
            share_slug: db.share_slug,
            share_url,
            updated_at: db.updated_at,
        }
    }
}

/// Appearance settings. Omitted fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ShelfSettingsUpdate {
    pub shelf_name: Option<String>,
    pub theme: Option<String>,
    pub spine_style: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// New seed for `random` ordering ("shuffle again")
    pub random_seed: Option<i32>,
    pub show_want_to_read: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShareResponse {
    pub is_public: bool,
    pub share_slug: Option<String>,
    pub share_url: Option<String>,
}

/// A followed reader's book, newest activity first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedEntryResponse {
    pub owner: UserSummary,
    pub book: BookResponse,
}

impl From<FeedEntryDBResponse> for FeedEntryResponse {
    fn from(db: FeedEntryDBResponse) -> Self {
        Self {
            owner: UserSummary {
                id: db.book.user_id,
                username: db.owner_username,
                display_name: db.owner_display_name,
                avatar_url: db.owner_avatar_url,
            },
            book: db.book.into(),
        }
    }
}

/// Appearance of a public shelf, without any of the owner's private switches.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicShelfSettings {
    pub shelf_name: String,
    pub theme: String,
    pub spine_style: String,
    pub sort_order: SortOrder,
}

impl From<&ShelfSettingsDBResponse> for PublicShelfSettings {
    fn from(db: &ShelfSettingsDBResponse) -> Self {
        Self {
            shelf_name: db.shelf_name.clone(),
            theme: db.theme.clone(),
            spine_style: db.spine_style.clone(),
            sort_order: db.sort_order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicShelfResponse {
    pub owner: UserSummary,
    pub bio: Option<String>,
    pub settings: PublicShelfSettings,
    pub books: Vec<BookResponse>,
}
