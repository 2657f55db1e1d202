//! Database repository for the follow graph.

use crate::db::{
    errors::Result,
    models::follows::{FollowDBResponse, ProfileCountsDBResponse},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Follows<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Follows<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Returns false when the follow already existed.
    #[instrument(skip(self), fields(follower = %abbrev_uuid(&follower_id), following = %abbrev_uuid(&following_id)), err)]
    pub async fn follow(&mut self, follower_id: UserId, following_id: UserId) -> Result<bool> {
        let result = sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns false when there was nothing to remove.
    #[instrument(skip(self), fields(follower = %abbrev_uuid(&follower_id), following = %abbrev_uuid(&following_id)), err)]
    pub async fn unfollow(&mut self, follower_id: UserId, following_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn is_following(&mut self, follower_id: UserId, following_id: UserId) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)")
            .bind(follower_id)
            .bind(following_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(exists)
    }

    /// Readers following `user_id`, most recent first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn followers(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<FollowDBResponse>> {
        let rows = sqlx::query_as::<_, FollowDBResponse>(
            r#"
            SELECT u.id AS user_id, u.username, u.display_name, u.avatar_url, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Readers `user_id` follows, most recent first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn following(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<FollowDBResponse>> {
        let rows = sqlx::query_as::<_, FollowDBResponse>(
            r#"
            SELECT u.id AS user_id, u.username, u.display_name, u.avatar_url, f.created_at AS followed_at
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }

    /// Per-status book counts and follow counts for a profile page.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn profile_counts(&mut self, user_id: UserId) -> Result<ProfileCountsDBResponse> {
        let counts = sqlx::query_as::<_, ProfileCountsDBResponse>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM books WHERE user_id = $1 AND status = 'reading') AS reading_count,
                (SELECT COUNT(*) FROM books WHERE user_id = $1 AND status = 'want-to-read') AS want_to_read_count,
                (SELECT COUNT(*) FROM books WHERE user_id = $1 AND status = 'read') AS read_count,
                (SELECT COUNT(*) FROM follows WHERE following_id = $1) AS followers_count,
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following_count
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(counts)
    }
}
