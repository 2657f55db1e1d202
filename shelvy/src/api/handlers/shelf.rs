use crate::AppState;
use crate::api::models::pagination::Pagination;
use crate::api::models::shelf::{FeedEntryResponse, ShareResponse, ShelfSettingsResponse, ShelfSettingsUpdate};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Books, ShelfSettings};
use crate::db::models::shelf_settings::ShelfSettingsUpdateDBRequest;
use crate::errors::{Error, Result};
use crate::shelf::share_slug;
use axum::{
    Json,
    extract::{Query, State},
};

const MAX_SHELF_NAME_LENGTH: usize = 60;
const MAX_STYLE_LENGTH: usize = 32;

/// Trimmed, non-empty, and at most `max` characters.
fn validate_label(field: &str, value: Option<String>, max: usize) -> Result<Option<String>> {
    let Some(value) = value else { return Ok(None) };
    let value = value.trim().to_string();
    if value.is_empty() || value.chars().count() > max {
        return Err(Error::BadRequest {
            message: format!("{field} must be 1-{max} characters"),
        });
    }
    Ok(Some(value))
}

#[utoipa::path(
    get,
    path = "/shelf/settings",
    tag = "shelf",
    summary = "Get shelf settings",
    responses(
        (status = 200, description = "Shelf settings, created with defaults on first read", body = ShelfSettingsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_settings(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ShelfSettingsResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = ShelfSettings::new(&mut pool_conn).get_or_create(current_user.id).await?;
    Ok(Json(ShelfSettingsResponse::from_db(settings, &state.config)))
}

#[utoipa::path(
    put,
    path = "/shelf/settings",
    tag = "shelf",
    summary = "Update shelf settings",
    request_body = ShelfSettingsUpdate,
    responses(
        (status = 200, description = "Settings updated", body = ShelfSettingsResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_settings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(update): Json<ShelfSettingsUpdate>,
) -> Result<Json<ShelfSettingsResponse>> {
    let request = ShelfSettingsUpdateDBRequest {
        shelf_name: validate_label("Shelf name", update.shelf_name, MAX_SHELF_NAME_LENGTH)?,
        theme: validate_label("Theme", update.theme, MAX_STYLE_LENGTH)?,
        spine_style: validate_label("Spine style", update.spine_style, MAX_STYLE_LENGTH)?,
        sort_order: update.sort_order,
        random_seed: update.random_seed,
        show_want_to_read: update.show_want_to_read,
    };

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = ShelfSettings::new(&mut pool_conn).update(current_user.id, &request).await?;
    Ok(Json(ShelfSettingsResponse::from_db(settings, &state.config)))
}

/// Make the shelf public. The first share generates the slug; later shares reuse it.
#[utoipa::path(
    post,
    path = "/shelf/share",
    tag = "shelf",
    summary = "Share shelf",
    responses(
        (status = 200, description = "Shelf is public", body = ShareResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn share_shelf(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ShareResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = ShelfSettings::new(&mut pool_conn).set_public(current_user.id, &share_slug()).await?;
    tracing::info!(user_id = %current_user.id, "Shelf shared");

    Ok(Json(ShareResponse {
        is_public: settings.is_public,
        share_url: settings.share_slug.as_deref().map(|slug| state.config.share_url(slug)),
        share_slug: settings.share_slug,
    }))
}

#[utoipa::path(
    delete,
    path = "/shelf/share",
    tag = "shelf",
    summary = "Stop sharing shelf",
    responses(
        (status = 200, description = "Shelf is private", body = ShareResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn unshare_shelf(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ShareResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = ShelfSettings::new(&mut pool_conn).set_private(current_user.id).await?;

    Ok(Json(ShareResponse {
        is_public: settings.is_public,
        share_slug: settings.share_slug,
        share_url: None,
    }))
}

#[utoipa::path(
    get,
    path = "/shelf/feed",
    tag = "shelf",
    summary = "Activity feed",
    params(Pagination),
    responses(
        (status = 200, description = "Recently updated books of followed readers", body = Vec<FeedEntryResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_feed(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<FeedEntryResponse>>> {
    let (skip, limit) = pagination.params();
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let entries = Books::new(&mut pool_conn).feed(current_user.id, skip, limit).await?;
    Ok(Json(entries.into_iter().map(FeedEntryResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use crate::api::models::shelf::{FeedEntryResponse, ShareResponse, ShelfSettingsResponse};
    use crate::shelf::sort::SortOrder;
    use crate::test_utils::{auth_header, create_test_app, create_test_book, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_settings_defaults_and_update(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&user);

        let defaults: ShelfSettingsResponse = server.get("/api/v1/shelf/settings").add_header(name.clone(), value.clone()).await.json();
        assert_eq!(defaults.sort_order, SortOrder::Manual);
        assert!(!defaults.is_public);
        assert!(defaults.show_want_to_read);
        assert_eq!(defaults.share_url, None);

        let updated: ShelfSettingsResponse = server
            .put("/api/v1/shelf/settings")
            .add_header(name.clone(), value.clone())
            .json(&json!({"shelf_name": " Reading Nook ", "sort_order": "random", "random_seed": 77, "show_want_to_read": false}))
            .await
            .json();
        assert_eq!(updated.shelf_name, "Reading Nook");
        assert_eq!(updated.sort_order, SortOrder::Random);
        assert_eq!(updated.random_seed, 77);
        assert!(!updated.show_want_to_read);
        assert_eq!(updated.theme, defaults.theme);

        server
            .put("/api/v1/shelf/settings")
            .add_header(name, value)
            .json(&json!({"shelf_name": ""}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_share_keeps_slug_across_toggles(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&user);

        let shared: ShareResponse = server.post("/api/v1/shelf/share").add_header(name.clone(), value.clone()).await.json();
        assert!(shared.is_public);
        let slug = shared.share_slug.clone().unwrap();
        assert_eq!(shared.share_url.as_deref(), Some(format!("http://localhost:5173/shelf/{slug}").as_str()));

        let private: ShareResponse = server.delete("/api/v1/shelf/share").add_header(name.clone(), value.clone()).await.json();
        assert!(!private.is_public);
        assert_eq!(private.share_url, None);

        let again: ShareResponse = server.post("/api/v1/shelf/share").add_header(name, value).await.json();
        assert_eq!(again.share_slug.as_deref(), Some(slug.as_str()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_feed_shows_followed_readers_only(pool: PgPool) {
        let me = create_test_user(&pool, "me").await;
        let friend = create_test_user(&pool, "friend").await;
        let stranger = create_test_user(&pool, "stranger").await;
        let friends_book = create_test_book(&pool, friend.id, "Dune").await;
        create_test_book(&pool, stranger.id, "Emma").await;
        sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)")
            .bind(me.id)
            .bind(friend.id)
            .execute(&pool)
            .await
            .unwrap();
        let server = create_test_app(pool);
        let (name, value) = auth_header(&me);

        let feed: Vec<FeedEntryResponse> = server.get("/api/v1/shelf/feed").add_header(name, value).await.json();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].book.id, friends_book.id);
        assert_eq!(feed[0].owner.username, "friend");
    }
}
