use crate::AppState;
use crate::api::handlers::books::load_visible_book;
use crate::api::models::engagement::{CommentCreate, CommentResponse, LikeResponse};
use crate::api::models::pagination::{PaginatedResponse, Pagination};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::Engagement;
use crate::db::models::engagement::CommentCreateDBRequest;
use crate::errors::{Error, Result};
use crate::types::{BookId, CommentId, Operation, Resource};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

const MAX_COMMENT_LENGTH: usize = 2_000;

#[utoipa::path(
    post,
    path = "/books/{id}/like",
    tag = "engagement",
    summary = "Like a book",
    responses(
        (status = 200, description = "Book liked", body = LikeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found or not visible"),
        (status = 409, description = "Already liked"),
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
pub async fn like_book(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<BookId>) -> Result<Json<LikeResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut tx, id, &current_user).await?;

    let mut engagement = Engagement::new(&mut tx);
    if !engagement.like(id, current_user.id).await? {
        return Err(Error::Conflict {
            message: "You have already liked this book".to_string(),
        });
    }
    let summary = engagement.like_summary(id, current_user.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(LikeResponse::from(summary)))
}

#[utoipa::path(
    delete,
    path = "/books/{id}/like",
    tag = "engagement",
    summary = "Remove a like",
    responses(
        (status = 200, description = "Like removed", body = LikeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found or not liked"),
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
pub async fn unlike_book(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<BookId>) -> Result<Json<LikeResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut tx, id, &current_user).await?;

    let mut engagement = Engagement::new(&mut tx);
    if !engagement.unlike(id, current_user.id).await? {
        return Err(Error::NotFound {
            resource: "Like".to_string(),
            id: id.to_string(),
        });
    }
    let summary = engagement.like_summary(id, current_user.id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(LikeResponse::from(summary)))
}

#[utoipa::path(
    get,
    path = "/books/{id}/comments",
    tag = "engagement",
    summary = "List comments on a book",
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "Comments, oldest first", body = PaginatedResponse<CommentResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Book not found or not visible"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_comments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<BookId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<CommentResponse>>> {
    let (skip, limit) = pagination.params();
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut tx, id, &current_user).await?;

    let mut engagement = Engagement::new(&mut tx);
    let comments = engagement.list_comments(id, skip, limit).await?;
    let total = engagement.count_comments(id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PaginatedResponse::new(
        comments.into_iter().map(CommentResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/books/{id}/comments",
    tag = "engagement",
    summary = "Comment on a book",
    request_body = CommentCreate,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
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
pub async fn create_comment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<BookId>,
    Json(create): Json<CommentCreate>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let content = create.content.trim();
    if content.is_empty() || content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Comments must be 1-{MAX_COMMENT_LENGTH} characters"),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_visible_book(&mut pool_conn, id, &current_user).await?;

    let comment = Engagement::new(&mut pool_conn)
        .create_comment(&CommentCreateDBRequest {
            book_id: id,
            user_id: current_user.id,
            content: content.to_string(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// Comments can be removed by whoever wrote them and by the owner of the book.
#[utoipa::path(
    delete,
    path = "/books/{id}/comments/{comment_id}",
    tag = "engagement",
    summary = "Delete a comment",
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither the comment author nor the book owner"),
        (status = 404, description = "Comment not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Book ID"),
        ("comment_id" = uuid::Uuid, Path, description = "Comment ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_comment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, comment_id)): Path<(BookId, CommentId)>,
) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let book = load_visible_book(&mut pool_conn, id, &current_user).await?;

    let mut engagement = Engagement::new(&mut pool_conn);
    let comment = engagement
        .get_comment(comment_id)
        .await?
        .filter(|c| c.book_id == id)
        .ok_or_else(|| Error::NotFound {
            resource: "Comment".to_string(),
            id: comment_id.to_string(),
        })?;

    if comment.user_id != current_user.id && book.user_id != current_user.id {
        return Err(Error::InsufficientPermissions {
            action: Operation::DeleteOwn,
            resource: Resource::Comments,
        });
    }

    engagement.delete_comment(comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::engagement::{CommentResponse, LikeResponse};
    use crate::api::models::pagination::PaginatedResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_book, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    async fn follow(pool: &PgPool, follower: uuid::Uuid, following: uuid::Uuid) {
        sqlx::query("INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)")
            .bind(follower)
            .bind(following)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_like_and_unlike(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let fan = create_test_user(&pool, "fan").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        follow(&pool, fan.id, owner.id).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&fan);
        let path = format!("/api/v1/books/{}/like", book.id);

        let liked: LikeResponse = server.post(&path).add_header(name.clone(), value.clone()).await.json();
        assert_eq!(liked.like_count, 1);
        assert!(liked.liked);

        server
            .post(&path)
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::CONFLICT);

        let unliked: LikeResponse = server.delete(&path).add_header(name.clone(), value.clone()).await.json();
        assert_eq!(unliked.like_count, 0);
        assert!(!unliked.liked);

        server.delete(&path).add_header(name, value).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_cannot_like_hidden_book(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let stranger = create_test_user(&pool, "stranger").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&stranger);

        server
            .post(&format!("/api/v1/books/{}/like", book.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_comments_and_deletion_rights(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        follow(&pool, alice.id, owner.id).await;
        follow(&pool, bob.id, owner.id).await;
        let server = create_test_app(pool);
        let (owner_h, owner_v) = auth_header(&owner);
        let (alice_h, alice_v) = auth_header(&alice);
        let (bob_h, bob_v) = auth_header(&bob);
        let path = format!("/api/v1/books/{}/comments", book.id);

        let response = server
            .post(&path)
            .add_header(alice_h.clone(), alice_v.clone())
            .json(&json!({"content": "Loved the worldbuilding"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let first: CommentResponse = response.json();
        assert_eq!(first.author.username, "alice");

        let second: CommentResponse = server
            .post(&path)
            .add_header(alice_h.clone(), alice_v.clone())
            .json(&json!({"content": "Second thoughts"}))
            .await
            .json();

        let listed: PaginatedResponse<CommentResponse> = server.get(&path).add_header(bob_h.clone(), bob_v.clone()).await.json();
        assert_eq!(listed.total_count, 2);
        assert_eq!(listed.data[0].id, first.id);

        // Another reader cannot delete it
        server
            .delete(&format!("{path}/{}", first.id))
            .add_header(bob_h, bob_v)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        // The author can
        server
            .delete(&format!("{path}/{}", first.id))
            .add_header(alice_h, alice_v)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        // So can the book owner
        server
            .delete(&format!("{path}/{}", second.id))
            .add_header(owner_h.clone(), owner_v.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let listed: PaginatedResponse<CommentResponse> = server.get(&path).add_header(owner_h, owner_v).await.json();
        assert_eq!(listed.total_count, 0);
    }

    #[sqlx::test]
    async fn test_empty_comment_rejected(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let book = create_test_book(&pool, owner.id, "Dune").await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&owner);

        server
            .post(&format!("/api/v1/books/{}/comments", book.id))
            .add_header(name, value)
            .json(&json!({"content": "  "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
