//! Database repository for books.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::books::{BookCreateDBRequest, BookDBResponse, BookMetadataFill, BookStatus, BookUpdateDBRequest, FeedEntryDBResponse},
};
use crate::types::{BookId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing one reader's books
#[derive(Debug, Clone)]
pub struct BookFilter {
    pub user_id: UserId,
    pub status: Option<BookStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl BookFilter {
    pub fn new(user_id: UserId, skip: i64, limit: i64) -> Self {
        Self {
            user_id,
            status: None,
            skip,
            limit,
        }
    }

    pub fn with_status(mut self, status: Option<BookStatus>) -> Self {
        self.status = status;
        self
    }
}

pub struct Books<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Books<'c> {
    type CreateRequest = BookCreateDBRequest;
    type UpdateRequest = BookUpdateDBRequest;
    type Response = BookDBResponse;
    type Id = BookId;
    type Filter = BookFilter;

    /// New books go to the end of the manual order.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let book = sqlx::query_as::<_, BookDBResponse>(
            r#"
            INSERT INTO books (
                id, user_id, title, author, isbn13, isbn10, google_books_id, cover_url, description,
                page_count, published_date, publisher, categories, status, rating, position,
                started_at, finished_at, metadata_attempted
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM books WHERE user_id = $2),
                $16, $17, $18
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.isbn13)
        .bind(&request.isbn10)
        .bind(&request.google_books_id)
        .bind(&request.cover_url)
        .bind(&request.description)
        .bind(request.page_count)
        .bind(&request.published_date)
        .bind(&request.publisher)
        .bind(&request.categories)
        .bind(request.status)
        .bind(request.rating)
        .bind(request.started_at)
        .bind(request.finished_at)
        .bind(request.metadata_attempted)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(book)
    }

    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let book = sqlx::query_as::<_, BookDBResponse>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(book)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<BookId>) -> Result<HashMap<Self::Id, BookDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let books = sqlx::query_as::<_, BookDBResponse>("SELECT * FROM books WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(books.into_iter().map(|b| (b.id, b)).collect())
    }

    /// Page through a shelf in manual order.
    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id), limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let books = sqlx::query_as::<_, BookDBResponse>(
            r#"
            SELECT * FROM books
            WHERE user_id = $1 AND ($2::book_status IS NULL OR status = $2)
            ORDER BY position ASC, created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(books)
    }

    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(book_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let book = sqlx::query_as::<_, BookDBResponse>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                cover_url = CASE WHEN $4::text IS NULL THEN cover_url ELSE NULLIF($4, '') END,
                description = CASE WHEN $5::text IS NULL THEN description ELSE NULLIF($5, '') END,
                page_count = COALESCE($6, page_count),
                published_date = COALESCE($7, published_date),
                publisher = COALESCE($8, publisher),
                categories = COALESCE($9, categories),
                status = COALESCE($10, status),
                rating = CASE WHEN $11 THEN $12 ELSE rating END,
                started_at = CASE WHEN $13 THEN $14 ELSE started_at END,
                finished_at = CASE WHEN $15 THEN $16 ELSE finished_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.cover_url)
        .bind(&request.description)
        .bind(request.page_count)
        .bind(&request.published_date)
        .bind(&request.publisher)
        .bind(&request.categories)
        .bind(request.status)
        .bind(request.rating.is_some())
        .bind(request.rating.flatten())
        .bind(request.started_at.is_some())
        .bind(request.started_at.flatten())
        .bind(request.finished_at.is_some())
        .bind(request.finished_at.flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(book)
    }
}

impl<'c> Books<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    pub async fn count(&mut self, filter: &BookFilter) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE user_id = $1 AND ($2::book_status IS NULL OR status = $2)")
            .bind(filter.user_id)
            .bind(filter.status)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Every book on a shelf, for orderings that need the whole set (category, random, ...).
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_all_for_user(&mut self, user_id: UserId, status: Option<BookStatus>) -> Result<Vec<BookDBResponse>> {
        let books = sqlx::query_as::<_, BookDBResponse>(
            r#"
            SELECT * FROM books
            WHERE user_id = $1 AND ($2::book_status IS NULL OR status = $2)
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(books)
    }

    /// Rewrite manual positions: `book_ids[i]` gets position `i`. IDs not owned by `user_id` are
    /// ignored. Returns the number of books moved.
    #[instrument(skip(self, book_ids), fields(user_id = %abbrev_uuid(&user_id), count = book_ids.len()), err)]
    pub async fn set_positions(&mut self, user_id: UserId, book_ids: &[BookId]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE books SET position = (t.ord - 1)::int
            FROM unnest($2::uuid[]) WITH ORDINALITY AS t(id, ord)
            WHERE books.id = t.id AND books.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(book_ids)
        .execute(&mut *self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Whether `viewer` may see `owner`'s books and their notes, likes and comments: their own
    /// shelf, a public shelf, or a reader they follow.
    #[instrument(skip(self), fields(owner = %abbrev_uuid(&owner_id), viewer = %abbrev_uuid(&viewer_id)), err)]
    pub async fn is_visible_to(&mut self, owner_id: UserId, viewer_id: UserId) -> Result<bool> {
        if owner_id == viewer_id {
            return Ok(true);
        }
        let visible = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM shelf_settings WHERE user_id = $1 AND is_public)
                OR EXISTS (SELECT 1 FROM follows WHERE following_id = $1 AND follower_id = $2)
            "#,
        )
        .bind(owner_id)
        .bind(viewer_id)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(visible)
    }

    /// Recently touched books of the readers `follower_id` follows, newest first.
    #[instrument(skip(self), fields(follower = %abbrev_uuid(&follower_id)), err)]
    pub async fn feed(&mut self, follower_id: UserId, skip: i64, limit: i64) -> Result<Vec<FeedEntryDBResponse>> {
        let entries = sqlx::query_as::<_, FeedEntryDBResponse>(
            r#"
            SELECT b.*,
                   u.username AS owner_username,
                   u.display_name AS owner_display_name,
                   u.avatar_url AS owner_avatar_url
            FROM books b
            JOIN follows f ON f.following_id = b.user_id
            JOIN users u ON u.id = b.user_id
            WHERE f.follower_id = $1
            ORDER BY b.updated_at DESC, b.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(follower_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(entries)
    }

    /// Books never looked up that still miss a cover, description, page count or categories,
    /// oldest first.
    #[instrument(skip(self), err)]
    pub async fn list_backfill_candidates(&mut self, limit: i64) -> Result<Vec<BookDBResponse>> {
        let books = sqlx::query_as::<_, BookDBResponse>(
            r#"
            SELECT * FROM books
            WHERE metadata_attempted = FALSE
              AND (cover_url IS NULL OR description IS NULL OR page_count IS NULL OR cardinality(categories) = 0)
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(books)
    }

    /// Fill only the columns that are still empty and mark the book as looked up.
    ///
    /// An ISBN-13 that the same reader already has on another book is skipped rather than
    /// tripping the per-reader uniqueness constraint.
    #[instrument(skip(self, fill), fields(book_id = %abbrev_uuid(&id)), err)]
    pub async fn apply_metadata(&mut self, id: BookId, fill: &BookMetadataFill) -> Result<BookDBResponse> {
        let book = sqlx::query_as::<_, BookDBResponse>(
            r#"
            UPDATE books SET
                isbn13 = COALESCE(isbn13, CASE
                    WHEN EXISTS (SELECT 1 FROM books other WHERE other.user_id = books.user_id AND other.isbn13 = $2) THEN NULL
                    ELSE $2 END),
                isbn10 = COALESCE(isbn10, $3),
                google_books_id = COALESCE(google_books_id, $4),
                cover_url = COALESCE(cover_url, $5),
                description = COALESCE(description, $6),
                page_count = COALESCE(page_count, $7),
                published_date = COALESCE(published_date, $8),
                publisher = COALESCE(publisher, $9),
                categories = CASE WHEN cardinality(categories) = 0 THEN $10 ELSE categories END,
                metadata_attempted = TRUE
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&fill.isbn13)
        .bind(&fill.isbn10)
        .bind(&fill.google_books_id)
        .bind(&fill.cover_url)
        .bind(&fill.description)
        .bind(fill.page_count)
        .bind(&fill.published_date)
        .bind(&fill.publisher)
        .bind(&fill.categories)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(book)
    }

    /// Record a lookup that found nothing so the backfill does not pick the book up again.
    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_metadata_attempted(&mut self, id: BookId) -> Result<()> {
        sqlx::query("UPDATE books SET metadata_attempted = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_user;
    use chrono::Utc;
    use sqlx::PgPool;

    pub(crate) fn book_request(user_id: UserId, title: &str) -> BookCreateDBRequest {
        BookCreateDBRequest {
            user_id,
            title: title.to_string(),
            author: "Some Author".to_string(),
            isbn13: None,
            isbn10: None,
            google_books_id: None,
            cover_url: None,
            description: None,
            page_count: None,
            published_date: None,
            publisher: None,
            categories: vec![],
            status: BookStatus::WantToRead,
            rating: None,
            started_at: None,
            finished_at: None,
            metadata_attempted: false,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_positions_append_and_reorder(pool: PgPool) {
        let user = create_test_user(&pool, "shelfowner").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Books::new(&mut conn);

        let a = repo.create(&book_request(user.id, "A")).await.unwrap();
        let b = repo.create(&book_request(user.id, "B")).await.unwrap();
        let c = repo.create(&book_request(user.id, "C")).await.unwrap();
        assert_eq!((a.position, b.position, c.position), (0, 1, 2));

        let moved = repo.set_positions(user.id, &[c.id, a.id, b.id]).await.unwrap();
        assert_eq!(moved, 3);

        let listed = repo.list(&BookFilter::new(user.id, 0, 10)).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[sqlx::test]
    async fn test_reorder_ignores_foreign_books(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let intruder = create_test_user(&pool, "intruder").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Books::new(&mut conn);

        let theirs = repo.create(&book_request(owner.id, "Theirs")).await.unwrap();
        let moved = repo.set_positions(intruder.id, &[theirs.id]).await.unwrap();
        assert_eq!(moved, 0);
    }

    #[sqlx::test]
    async fn test_update_nullable_fields(pool: PgPool) {
        let user = create_test_user(&pool, "rater").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Books::new(&mut conn);
        let book = repo.create(&book_request(user.id, "Rated")).await.unwrap();

        let now = Utc::now();
        let updated = repo
            .update(
                book.id,
                &BookUpdateDBRequest {
                    status: Some(BookStatus::Reading),
                    rating: Some(Some(4)),
                    started_at: Some(Some(now)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, BookStatus::Reading);
        assert_eq!(updated.rating, Some(4));
        assert!(updated.started_at.is_some());

        // Leaving rating alone, then clearing it
        let updated = repo
            .update(
                book.id,
                &BookUpdateDBRequest {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, Some(4));

        let updated = repo
            .update(
                book.id,
                &BookUpdateDBRequest {
                    rating: Some(None),
                    started_at: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, None);
        assert!(updated.started_at.is_none());
        assert_eq!(updated.title, "Renamed");
    }

    #[sqlx::test]
    async fn test_apply_metadata_fills_only_missing(pool: PgPool) {
        let user = create_test_user(&pool, "filler").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Books::new(&mut conn);

        let mut request = book_request(user.id, "Partly Known");
        request.description = Some("Mine".to_string());
        let book = repo.create(&request).await.unwrap();

        let fill = BookMetadataFill {
            description: Some("Provider text".to_string()),
            cover_url: Some("https://example.com/c.jpg".to_string()),
            page_count: Some(320),
            categories: vec!["Fantasy".to_string()],
            ..Default::default()
        };
        let updated = repo.apply_metadata(book.id, &fill).await.unwrap();

        assert_eq!(updated.description.as_deref(), Some("Mine"));
        assert_eq!(updated.cover_url.as_deref(), Some("https://example.com/c.jpg"));
        assert_eq!(updated.page_count, Some(320));
        assert_eq!(updated.categories, vec!["Fantasy".to_string()]);
        assert!(updated.metadata_attempted);

        let candidates = repo.list_backfill_candidates(10).await.unwrap();
        assert!(candidates.iter().all(|b| b.id != book.id));
    }

    #[sqlx::test]
    async fn test_duplicate_isbn_is_unique_violation(pool: PgPool) {
        let user = create_test_user(&pool, "collector").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Books::new(&mut conn);

        let mut request = book_request(user.id, "Twice");
        request.isbn13 = Some("9780306406157".to_string());
        repo.create(&request).await.unwrap();

        let err = repo.create(&request).await.unwrap_err();
        match err {
            DbError::UniqueViolation { constraint, .. } => assert_eq!(constraint.as_deref(), Some("books_user_isbn13_unique")),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }
}
