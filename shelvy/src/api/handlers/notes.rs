use crate::AppState;
use crate::api::handlers::books::load_visible_book;
use crate::api::models::notes::{NoteCreate, NoteResponse, NoteUpdate};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::Notes;
use crate::db::models::notes::{NoteCreateDBRequest, NoteDBResponse, NoteUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{BookId, NoteId, Operation, Resource};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;

const MAX_NOTE_LENGTH: usize = 10_000;

fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::BadRequest {
            message: "Note must not be empty".to_string(),
        });
    }
    if content.chars().count() > MAX_NOTE_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Note must be at most {MAX_NOTE_LENGTH} characters"),
        });
    }
    Ok(content.to_string())
}

fn validate_page(page: Option<i32>) -> Result<()> {
    match page {
        Some(p) if p < 1 => Err(Error::BadRequest {
            message: "Page must be a positive number".to_string(),
        }),
        _ => Ok(()),
    }
}

/// A note on a visible book that the caller wrote. Other readers' private notes do not exist as
/// far as the caller can tell.
async fn load_own_note(
    conn: &mut PgConnection,
    book_id: BookId,
    note_id: NoteId,
    user: &CurrentUser,
    action: Operation,
) -> Result<NoteDBResponse> {
    load_visible_book(&mut *conn, book_id, user).await?;

    let not_found = || Error::NotFound {
        resource: "Note".to_string(),
        id: note_id.to_string(),
    };
    let note = Notes::new(&mut *conn)
        .get_by_id(note_id)
        .await?
        .filter(|n| n.book_id == book_id)
        .ok_or_else(not_found)?;

    if note.user_id != user.id {
        if note.is_private {
            return Err(not_found());
        }
        return Err(Error::InsufficientPermissions {
            action,
            resource: Resource::Notes,
        });
    }
    Ok(note)
}

#[utoipa::path(
    get,
    path = "/books/{id}/notes",
    tag = "notes",
    summary = "List notes on a book",
    responses(
        (status = 200, description = "Notes by page, private ones only for their author", body = Vec<NoteResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found or not visible"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_notes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<BookId>,
) -> Result<Json<Vec<NoteResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut pool_conn, id, &current_user).await?;

    let notes = Notes::new(&mut pool_conn).list_for_book(id, current_user.id).await?;
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/books/{id}/notes",
    tag = "notes",
    summary = "Add a note",
    request_body = NoteCreate,
    responses(
        (status = 201, description = "Note added", body = NoteResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found or not visible"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_note(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<BookId>,
    Json(create): Json<NoteCreate>,
) -> Result<(StatusCode, Json<NoteResponse>)> {
    let content = validate_content(&create.content)?;
    validate_page(create.page)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut pool_conn, id, &current_user).await?;

    let note = Notes::new(&mut pool_conn)
        .create(&NoteCreateDBRequest {
            book_id: id,
            user_id: current_user.id,
            content,
            page: create.page,
            is_private: create.is_private,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

#[utoipa::path(
    patch,
    path = "/books/{id}/notes/{note_id}",
    tag = "notes",
    summary = "Edit a note",
    request_body = NoteUpdate,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your note"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID"),
        ("note_id" = uuid::Uuid, Path, description = "Note ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_note(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, note_id)): Path<(BookId, NoteId)>,
    Json(update): Json<NoteUpdate>,
) -> Result<Json<NoteResponse>> {
    let content = update.content.as_deref().map(validate_content).transpose()?;
    validate_page(update.page.flatten())?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    load_own_note(&mut tx, id, note_id, &current_user, Operation::UpdateOwn).await?;

    let note = Notes::new(&mut tx)
        .update(
            note_id,
            &NoteUpdateDBRequest {
                content,
                page: update.page,
                is_private: update.is_private,
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(NoteResponse::from(note)))
}

#[utoipa::path(
    delete,
    path = "/books/{id}/notes/{note_id}",
    tag = "notes",
    summary = "Delete a note",
    responses(
        (status = 204, description = "Note deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your note"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID"),
        ("note_id" = uuid::Uuid, Path, description = "Note ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_note(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, note_id)): Path<(BookId, NoteId)>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_own_note(&mut pool_conn, id, note_id, &current_user, Operation::DeleteOwn).await?;

    Notes::new(&mut pool_conn).delete(note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::notes::NoteResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_book, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    async fn make_public(pool: &PgPool, user_id: uuid::Uuid) {
        sqlx::query("INSERT INTO shelf_settings (user_id, is_public, share_slug) VALUES ($1, TRUE, 'notes-test')")
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_note_lifecycle(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let book = create_test_book(&pool, user.id, "Dune").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&user);
        let notes_path = format!("/api/v1/books/{}/notes", book.id);

        let response = server
            .post(&notes_path)
            .add_header(name.clone(), value.clone())
            .json(&json!({"content": "  The spice must flow ", "page": 42}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let note: NoteResponse = response.json();
        assert_eq!(note.content, "The spice must flow");
        assert_eq!(note.page, Some(42));
        assert!(!note.is_private);

        let updated: NoteResponse = server
            .patch(&format!("{notes_path}/{}", note.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"page": null, "is_private": true}))
            .await
            .json();
        assert_eq!(updated.page, None);
        assert!(updated.is_private);
        assert_eq!(updated.content, "The spice must flow");

        let listed: Vec<NoteResponse> = server.get(&notes_path).add_header(name.clone(), value.clone()).await.json();
        assert_eq!(listed.len(), 1);

        server
            .delete(&format!("{notes_path}/{}", note.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let listed: Vec<NoteResponse> = server.get(&notes_path).add_header(name, value).await.json();
        assert!(listed.is_empty());
    }

    #[sqlx::test]
    async fn test_note_validation(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let book = create_test_book(&pool, user.id, "Dune").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&user);
        let notes_path = format!("/api/v1/books/{}/notes", book.id);

        for body in [json!({"content": "   "}), json!({"content": "ok", "page": 0})] {
            server
                .post(&notes_path)
                .add_header(name.clone(), value.clone())
                .json(&body)
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_private_notes_hidden_from_others(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let visitor = create_test_user(&pool, "visitor").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        make_public(&pool, owner.id).await;
        let server = create_test_app(pool);
        let (owner_h, owner_v) = auth_header(&owner);
        let (visitor_h, visitor_v) = auth_header(&visitor);
        let notes_path = format!("/api/v1/books/{}/notes", book.id);

        let private: NoteResponse = server
            .post(&notes_path)
            .add_header(owner_h.clone(), owner_v.clone())
            .json(&json!({"content": "Just for me", "is_private": true}))
            .await
            .json();
        let public: NoteResponse = server
            .post(&notes_path)
            .add_header(owner_h, owner_v)
            .json(&json!({"content": "Worth sharing"}))
            .await
            .json();

        let seen: Vec<NoteResponse> = server.get(&notes_path).add_header(visitor_h.clone(), visitor_v.clone()).await.json();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, public.id);

        // Editing someone else's note
        server
            .patch(&format!("{notes_path}/{}", public.id))
            .add_header(visitor_h.clone(), visitor_v.clone())
            .json(&json!({"content": "Vandalised"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("{notes_path}/{}", private.id))
            .add_header(visitor_h, visitor_v)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_notes_on_hidden_book(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let stranger = create_test_user(&pool, "stranger").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&stranger);

        server
            .get(&format!("/api/v1/books/{}/notes", book.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
