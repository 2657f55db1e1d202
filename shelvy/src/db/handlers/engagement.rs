//! Database repository for likes and comments on books.

use crate::db::{
    errors::Result,
    models::engagement::{CommentCreateDBRequest, CommentDBResponse, LikeSummaryDBResponse},
};
use crate::types::{BookId, CommentId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.book_id, c.user_id, c.content, c.created_at, u.username, u.display_name, u.avatar_url
    FROM book_comments c
    JOIN users u ON u.id = c.user_id
"#;

pub struct Engagement<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Engagement<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Returns false when the book was already liked.
    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn like(&mut self, book_id: BookId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("INSERT INTO book_likes (book_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn unlike(&mut self, book_id: BookId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM book_likes WHERE book_id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id)), err)]
    pub async fn like_summary(&mut self, book_id: BookId, viewer_id: UserId) -> Result<LikeSummaryDBResponse> {
        let summary = sqlx::query_as::<_, LikeSummaryDBResponse>(
            r#"
            SELECT COUNT(*) AS like_count, COALESCE(bool_or(user_id = $2), FALSE) AS liked
            FROM book_likes
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .bind(viewer_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(summary)
    }

    #[instrument(skip(self, request), fields(book_id = %abbrev_uuid(&request.book_id)), err)]
    pub async fn create_comment(&mut self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse> {
        let id: CommentId = sqlx::query_scalar(
            "INSERT INTO book_comments (id, book_id, user_id, content) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(request.book_id)
        .bind(request.user_id)
        .bind(&request.content)
        .fetch_one(&mut *self.db)
        .await?;

        let comment = sqlx::query_as::<_, CommentDBResponse>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(comment)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    pub async fn get_comment(&mut self, id: CommentId) -> Result<Option<CommentDBResponse>> {
        let comment = sqlx::query_as::<_, CommentDBResponse>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(comment)
    }

    /// Oldest first, so a thread reads top to bottom.
    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id)), err)]
    pub async fn list_comments(&mut self, book_id: BookId, skip: i64, limit: i64) -> Result<Vec<CommentDBResponse>> {
        let comments = sqlx::query_as::<_, CommentDBResponse>(&format!(
            "{COMMENT_SELECT} WHERE c.book_id = $1 ORDER BY c.created_at ASC LIMIT $2 OFFSET $3"
        ))
        .bind(book_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(comments)
    }

    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id)), err)]
    pub async fn count_comments(&mut self, book_id: BookId) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM book_comments WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    pub async fn delete_comment(&mut self, id: CommentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM book_comments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_book, create_test_user};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_likes_are_one_per_reader(pool: PgPool) {
        let owner = create_test_user(&pool, "likedowner").await;
        let fan = create_test_user(&pool, "fan").await;
        let book = create_test_book(&pool, owner.id, "Lovable").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Engagement::new(&mut conn);

        assert!(repo.like(book.id, fan.id).await.unwrap());
        assert!(!repo.like(book.id, fan.id).await.unwrap());

        let summary = repo.like_summary(book.id, fan.id).await.unwrap();
        assert_eq!(summary.like_count, 1);
        assert!(summary.liked);

        let summary = repo.like_summary(book.id, owner.id).await.unwrap();
        assert!(!summary.liked);

        assert!(repo.unlike(book.id, fan.id).await.unwrap());
        let summary = repo.like_summary(book.id, fan.id).await.unwrap();
        assert_eq!(summary.like_count, 0);
        assert!(!summary.liked);
    }

    #[sqlx::test]
    async fn test_comments_carry_author(pool: PgPool) {
        let owner = create_test_user(&pool, "commented").await;
        let critic = create_test_user(&pool, "critic").await;
        let book = create_test_book(&pool, owner.id, "Debatable").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Engagement::new(&mut conn);

        let comment = repo
            .create_comment(&CommentCreateDBRequest {
                book_id: book.id,
                user_id: critic.id,
                content: "Loved the ending".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(comment.username, "critic");

        let comments = repo.list_comments(book.id, 0, 10).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(repo.count_comments(book.id).await.unwrap(), 1);

        assert!(repo.delete_comment(comment.id).await.unwrap());
        assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    }
}
