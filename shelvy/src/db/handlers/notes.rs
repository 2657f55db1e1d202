//! Database repository for reading notes.

use crate::db::{
    errors::{DbError, Result},
    models::notes::{NoteCreateDBRequest, NoteDBResponse, NoteUpdateDBRequest},
};
use crate::types::{BookId, NoteId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Notes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(book_id = %abbrev_uuid(&request.book_id)), err)]
    pub async fn create(&mut self, request: &NoteCreateDBRequest) -> Result<NoteDBResponse> {
        let note = sqlx::query_as::<_, NoteDBResponse>(
            r#"
            INSERT INTO book_notes (id, book_id, user_id, content, page, is_private)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.book_id)
        .bind(request.user_id)
        .bind(&request.content)
        .bind(request.page)
        .bind(request.is_private)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(note)
    }

    #[instrument(skip(self), fields(note_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: NoteId) -> Result<Option<NoteDBResponse>> {
        let note = sqlx::query_as::<_, NoteDBResponse>("SELECT * FROM book_notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(note)
    }

    /// Notes on a book in page order. Private notes are only returned to their author.
    #[instrument(skip(self), fields(book_id = %abbrev_uuid(&book_id), viewer = %abbrev_uuid(&viewer_id)), err)]
    pub async fn list_for_book(&mut self, book_id: BookId, viewer_id: UserId) -> Result<Vec<NoteDBResponse>> {
        let notes = sqlx::query_as::<_, NoteDBResponse>(
            r#"
            SELECT * FROM book_notes
            WHERE book_id = $1 AND (NOT is_private OR user_id = $2)
            ORDER BY page ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(book_id)
        .bind(viewer_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(notes)
    }

    #[instrument(skip(self, request), fields(note_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: NoteId, request: &NoteUpdateDBRequest) -> Result<NoteDBResponse> {
        let note = sqlx::query_as::<_, NoteDBResponse>(
            r#"
            UPDATE book_notes SET
                content = COALESCE($2, content),
                page = CASE WHEN $3 THEN $4 ELSE page END,
                is_private = COALESCE($5, is_private),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.content)
        .bind(request.page.is_some())
        .bind(request.page.flatten())
        .bind(request.is_private)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(note)
    }

    #[instrument(skip(self), fields(note_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: NoteId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM book_notes WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}
