//! Database models for per-reader shelf settings.

use crate::shelf::sort::SortOrder;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for updating shelf settings. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ShelfSettingsUpdateDBRequest {
    pub shelf_name: Option<String>,
    pub theme: Option<String>,
    pub spine_style: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub random_seed: Option<i32>,
    pub show_want_to_read: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ShelfSettingsDBResponse {
    pub user_id: UserId,
    pub shelf_name: String,
    pub theme: String,
    pub spine_style: String,
    pub sort_order: SortOrder,
    pub random_seed: i32,
    pub show_want_to_read: bool,
    pub is_public: bool,
    pub share_slug: Option<String>,
    pub updated_at: DateTime<Utc>,
}
