//! Database repository for shelf settings and public sharing.

use crate::db::{
    errors::{DbError, Result},
    models::shelf_settings::{ShelfSettingsDBResponse, ShelfSettingsUpdateDBRequest},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct ShelfSettings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ShelfSettings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Settings rows are created lazily with column defaults on first read.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_or_create(&mut self, user_id: UserId) -> Result<ShelfSettingsDBResponse> {
        sqlx::query("INSERT INTO shelf_settings (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        let settings = sqlx::query_as::<_, ShelfSettingsDBResponse>("SELECT * FROM shelf_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(settings)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn update(&mut self, user_id: UserId, request: &ShelfSettingsUpdateDBRequest) -> Result<ShelfSettingsDBResponse> {
        self.get_or_create(user_id).await?;

        let settings = sqlx::query_as::<_, ShelfSettingsDBResponse>(
            r#"
            UPDATE shelf_settings SET
                shelf_name = COALESCE($2, shelf_name),
                theme = COALESCE($3, theme),
                spine_style = COALESCE($4, spine_style),
                sort_order = COALESCE($5, sort_order),
                random_seed = COALESCE($6, random_seed),
                show_want_to_read = COALESCE($7, show_want_to_read),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.shelf_name)
        .bind(&request.theme)
        .bind(&request.spine_style)
        .bind(request.sort_order)
        .bind(request.random_seed)
        .bind(request.show_want_to_read)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(settings)
    }

    /// Make the shelf public. An existing slug is kept so old links keep working; `new_slug` is
    /// only used when the shelf has never been shared.
    #[instrument(skip(self, new_slug), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn set_public(&mut self, user_id: UserId, new_slug: &str) -> Result<ShelfSettingsDBResponse> {
        self.get_or_create(user_id).await?;

        let settings = sqlx::query_as::<_, ShelfSettingsDBResponse>(
            r#"
            UPDATE shelf_settings SET
                is_public = TRUE,
                share_slug = COALESCE(share_slug, $2),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(new_slug)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(settings)
    }

    /// Hide the shelf again. The slug is retained but no longer resolves.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn set_private(&mut self, user_id: UserId) -> Result<ShelfSettingsDBResponse> {
        self.get_or_create(user_id).await?;

        let settings = sqlx::query_as::<_, ShelfSettingsDBResponse>(
            "UPDATE shelf_settings SET is_public = FALSE, updated_at = NOW() WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(settings)
    }

    /// Settings of a public shelf by its share slug. Private shelves do not resolve.
    #[instrument(skip(self), err)]
    pub async fn get_public_by_slug(&mut self, slug: &str) -> Result<Option<ShelfSettingsDBResponse>> {
        let settings = sqlx::query_as::<_, ShelfSettingsDBResponse>("SELECT * FROM shelf_settings WHERE share_slug = $1 AND is_public")
            .bind(slug)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(settings)
    }
}
