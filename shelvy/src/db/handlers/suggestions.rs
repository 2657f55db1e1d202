//! Database repository for club reading suggestions and their votes.

use crate::db::{
    errors::Result,
    models::suggestions::{SuggestionCreateDBRequest, SuggestionDBResponse},
};
use crate::types::{ClubId, SuggestionId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Suggestion columns plus suggester profile, vote tally and the viewer's vote (`$1`).
const SUGGESTION_SELECT: &str = r#"
    SELECT s.*,
           u.username AS suggester_username,
           u.display_name AS suggester_display_name,
           u.avatar_url AS suggester_avatar_url,
           (SELECT COUNT(*) FROM suggestion_votes v WHERE v.suggestion_id = s.id) AS vote_count,
           EXISTS (SELECT 1 FROM suggestion_votes v WHERE v.suggestion_id = s.id AND v.user_id = $1) AS has_voted
    FROM club_suggestions s
    JOIN users u ON u.id = s.suggested_by
"#;

pub struct Suggestions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Suggestions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(club_id = %abbrev_uuid(&request.club_id), title = %request.title), err)]
    pub async fn create(&mut self, request: &SuggestionCreateDBRequest) -> Result<SuggestionDBResponse> {
        let id: SuggestionId = sqlx::query_scalar(
            r#"
            INSERT INTO club_suggestions (id, club_id, suggested_by, title, author, isbn13, cover_url, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.club_id)
        .bind(request.suggested_by)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.isbn13)
        .bind(&request.cover_url)
        .bind(&request.reason)
        .fetch_one(&mut *self.db)
        .await?;

        let suggestion = sqlx::query_as::<_, SuggestionDBResponse>(&format!("{SUGGESTION_SELECT} WHERE s.id = $2"))
            .bind(request.suggested_by)
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(suggestion)
    }

    #[instrument(skip(self), fields(suggestion_id = %abbrev_uuid(&id)), err)]
    pub async fn get(&mut self, id: SuggestionId, viewer_id: UserId) -> Result<Option<SuggestionDBResponse>> {
        let suggestion = sqlx::query_as::<_, SuggestionDBResponse>(&format!("{SUGGESTION_SELECT} WHERE s.id = $2"))
            .bind(viewer_id)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(suggestion)
    }

    /// A club's suggestions, most voted first, ties by age.
    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id)), err)]
    pub async fn list_for_club(&mut self, club_id: ClubId, viewer_id: UserId) -> Result<Vec<SuggestionDBResponse>> {
        let suggestions = sqlx::query_as::<_, SuggestionDBResponse>(&format!(
            "{SUGGESTION_SELECT} WHERE s.club_id = $2 ORDER BY vote_count DESC, s.created_at ASC"
        ))
        .bind(viewer_id)
        .bind(club_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(suggestions)
    }

    #[instrument(skip(self), fields(suggestion_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: SuggestionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM club_suggestions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One vote per reader: a repeat vote is a unique violation on `suggestion_votes_pkey`.
    #[instrument(skip(self), fields(suggestion_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn vote(&mut self, id: SuggestionId, user_id: UserId) -> Result<()> {
        sqlx::query("INSERT INTO suggestion_votes (suggestion_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(suggestion_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn unvote(&mut self, id: SuggestionId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM suggestion_votes WHERE suggestion_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
