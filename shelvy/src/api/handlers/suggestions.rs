use crate::AppState;
use crate::api::handlers::clubs::{require_manager, require_member};
use crate::api::models::clubs::ClubResponse;
use crate::api::models::suggestions::{SuggestionCreate, SuggestionResponse};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Clubs, Suggestions};
use crate::db::models::clubs::CurrentBookDBRequest;
use crate::db::models::suggestions::{SuggestionCreateDBRequest, SuggestionDBResponse};
use crate::errors::{Error, Result};
use crate::shelf::covers::normalize_cover_url;
use crate::shelf::isbn::Isbn;
use crate::types::{ClubId, Operation, Resource, SuggestionId, abbrev_uuid};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;

const MAX_TITLE_LENGTH: usize = 500;
const MAX_REASON_LENGTH: usize = 1_000;

fn suggestion_not_found(id: SuggestionId) -> Error {
    Error::NotFound {
        resource: "Suggestion".to_string(),
        id: id.to_string(),
    }
}

/// A suggestion addressed through the wrong club is treated as missing.
async fn load_suggestion(conn: &mut PgConnection, club_id: ClubId, id: SuggestionId, viewer: &CurrentUser) -> Result<SuggestionDBResponse> {
    Suggestions::new(conn)
        .get(id, viewer.id)
        .await?
        .filter(|s| s.club_id == club_id)
        .ok_or_else(|| suggestion_not_found(id))
}

#[utoipa::path(
    get,
    path = "/clubs/{id}/suggestions",
    tag = "suggestions",
    summary = "List suggestions",
    responses(
        (status = 200, description = "Most voted first, ties by age", body = Vec<SuggestionResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Club not found or not a member"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_suggestions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
) -> Result<Json<Vec<SuggestionResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    require_member(&mut pool_conn, id, &current_user).await?;

    let suggestions = Suggestions::new(&mut pool_conn).list_for_club(id, current_user.id).await?;
    Ok(Json(suggestions.into_iter().map(SuggestionResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/clubs/{id}/suggestions",
    tag = "suggestions",
    summary = "Suggest a book",
    request_body = SuggestionCreate,
    responses(
        (status = 201, description = "Suggestion added", body = SuggestionResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Club not found or not a member"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_suggestion(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
    Json(create): Json<SuggestionCreate>,
) -> Result<(StatusCode, Json<SuggestionResponse>)> {
    let title = create.title.trim().to_string();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Titles must be 1-{MAX_TITLE_LENGTH} characters"),
        });
    }
    let reason = create.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if reason.as_ref().is_some_and(|r| r.chars().count() > MAX_REASON_LENGTH) {
        return Err(Error::BadRequest {
            message: format!("Reasons must be at most {MAX_REASON_LENGTH} characters"),
        });
    }
    let isbn13 = match create.isbn.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
        Some(raw) => Isbn::parse(raw)
            .ok_or_else(|| Error::BadRequest {
                message: format!("'{raw}' is not a valid ISBN"),
            })?
            .isbn13,
        None => None,
    };
    let cover_url = match create.cover_url.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => Some(normalize_cover_url(raw).ok_or_else(|| Error::BadRequest {
            message: "Cover must be an http(s) URL".to_string(),
        })?),
        None => None,
    };

    let request = SuggestionCreateDBRequest {
        club_id: id,
        suggested_by: current_user.id,
        title,
        author: create.author.map(|a| a.trim().to_string()).unwrap_or_default(),
        isbn13,
        cover_url,
        reason,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    require_member(&mut tx, id, &current_user).await?;
    let suggestion = Suggestions::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(SuggestionResponse::from(suggestion))))
}

#[utoipa::path(
    delete,
    path = "/clubs/{id}/suggestions/{suggestion_id}",
    tag = "suggestions",
    summary = "Withdraw a suggestion",
    responses(
        (status = 204, description = "Suggestion deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the suggester or a club manager may delete it"),
        (status = 404, description = "Club or suggestion not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("suggestion_id" = uuid::Uuid, Path, description = "Suggestion ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_suggestion(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, suggestion_id)): Path<(ClubId, SuggestionId)>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let role = require_member(&mut tx, id, &current_user).await?;
    let suggestion = load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;
    if suggestion.suggested_by != current_user.id && !role.can_manage() {
        return Err(Error::InsufficientPermissions {
            action: Operation::DeleteAll,
            resource: Resource::Suggestions,
        });
    }

    Suggestions::new(&mut tx).delete(suggestion_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/clubs/{id}/suggestions/{suggestion_id}/vote",
    tag = "suggestions",
    summary = "Vote for a suggestion",
    responses(
        (status = 200, description = "Vote counted", body = SuggestionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Club or suggestion not found"),
        (status = 409, description = "Already voted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("suggestion_id" = uuid::Uuid, Path, description = "Suggestion ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn vote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, suggestion_id)): Path<(ClubId, SuggestionId)>,
) -> Result<Json<SuggestionResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    require_member(&mut tx, id, &current_user).await?;
    load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;

    Suggestions::new(&mut tx).vote(suggestion_id, current_user.id).await?;
    let suggestion = load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SuggestionResponse::from(suggestion)))
}

#[utoipa::path(
    delete,
    path = "/clubs/{id}/suggestions/{suggestion_id}/vote",
    tag = "suggestions",
    summary = "Withdraw a vote",
    responses(
        (status = 200, description = "Vote withdrawn", body = SuggestionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Club, suggestion or vote not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("suggestion_id" = uuid::Uuid, Path, description = "Suggestion ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn unvote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, suggestion_id)): Path<(ClubId, SuggestionId)>,
) -> Result<Json<SuggestionResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    require_member(&mut tx, id, &current_user).await?;
    load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;

    if !Suggestions::new(&mut tx).unvote(suggestion_id, current_user.id).await? {
        return Err(Error::NotFound {
            resource: "Vote".to_string(),
            id: suggestion_id.to_string(),
        });
    }
    let suggestion = load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SuggestionResponse::from(suggestion)))
}

/// Make a suggestion the club's current book. The suggestion itself stays in the list.
#[utoipa::path(
    post,
    path = "/clubs/{id}/suggestions/{suggestion_id}/select",
    tag = "suggestions",
    summary = "Pick the next read",
    responses(
        (status = 200, description = "Club with its new current book", body = ClubResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only owners and admins pick the book"),
        (status = 404, description = "Club or suggestion not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("suggestion_id" = uuid::Uuid, Path, description = "Suggestion ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn select_suggestion(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, suggestion_id)): Path<(ClubId, SuggestionId)>,
) -> Result<Json<ClubResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let role = require_manager(&mut tx, id, &current_user, Operation::UpdateAll, Resource::Clubs).await?;
    let suggestion = load_suggestion(&mut tx, id, suggestion_id, &current_user).await?;

    let club = Clubs::new(&mut tx)
        .set_current_book(
            id,
            &CurrentBookDBRequest {
                suggestion_id,
                title: suggestion.title,
                author: suggestion.author,
                cover_url: suggestion.cover_url,
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    tracing::info!(club_id = %abbrev_uuid(&id), suggestion_id = %abbrev_uuid(&suggestion_id), "Club book selected");

    Ok(Json(ClubResponse::from(club).with_role(Some(role))))
}

#[cfg(test)]
mod tests {
    use crate::api::models::clubs::ClubResponse;
    use crate::api::models::suggestions::SuggestionResponse;
    use crate::db::models::users::UserDBResponse;
    use crate::test_utils::{auth_header, create_test_app, create_test_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use sqlx::PgPool;

    /// A club owned by `owner` with `members` joined.
    async fn club_with(server: &TestServer, owner: &UserDBResponse, members: &[&UserDBResponse]) -> ClubResponse {
        let (h, v) = auth_header(owner);
        let club: ClubResponse = server.post("/api/v1/clubs").add_header(h, v).json(&json!({"name": "Readers"})).await.json();
        for member in members {
            let (h, v) = auth_header(member);
            server
                .post("/api/v1/clubs/join")
                .add_header(h, v)
                .json(&json!({"invite_code": club.invite_code}))
                .await
                .assert_status_ok();
        }
        club
    }

    async fn suggest(server: &TestServer, user: &UserDBResponse, club: &ClubResponse, title: &str) -> SuggestionResponse {
        let (h, v) = auth_header(user);
        let response = server
            .post(&format!("/api/v1/clubs/{}/suggestions", club.id))
            .add_header(h, v)
            .json(&json!({"title": title, "author": "Someone"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_votes_are_one_per_reader_and_order_the_list(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let server = create_test_app(pool);
        let club = club_with(&server, &owner, &[&alice, &bob]).await;

        let first = suggest(&server, &owner, &club, "Middlemarch").await;
        let second = suggest(&server, &alice, &club, "Piranesi").await;
        assert_eq!(second.vote_count, 0);
        assert_eq!(second.suggested_by.username, "alice");

        let vote_path = format!("/api/v1/clubs/{}/suggestions/{}/vote", club.id, second.id);
        let (alice_h, alice_v) = auth_header(&alice);
        let (bob_h, bob_v) = auth_header(&bob);

        let voted: SuggestionResponse = server.post(&vote_path).add_header(alice_h.clone(), alice_v.clone()).await.json();
        assert_eq!(voted.vote_count, 1);
        assert!(voted.has_voted);

        server
            .post(&vote_path)
            .add_header(alice_h.clone(), alice_v.clone())
            .await
            .assert_status(StatusCode::CONFLICT);
        server.post(&vote_path).add_header(bob_h.clone(), bob_v.clone()).await.assert_status_ok();

        let list: Vec<SuggestionResponse> = server
            .get(&format!("/api/v1/clubs/{}/suggestions", club.id))
            .add_header(bob_h.clone(), bob_v.clone())
            .await
            .json();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[0].vote_count, 2);
        assert!(list[0].has_voted);
        assert_eq!(list[1].id, first.id);
        assert!(!list[1].has_voted);

        let unvoted: SuggestionResponse = server.delete(&vote_path).add_header(bob_h.clone(), bob_v.clone()).await.json();
        assert_eq!(unvoted.vote_count, 1);
        assert!(!unvoted.has_voted);
        server.delete(&vote_path).add_header(bob_h, bob_v).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_non_members_see_nothing(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let outsider = create_test_user(&pool, "outsider").await;
        let server = create_test_app(pool);
        let club = club_with(&server, &owner, &[]).await;
        let suggestion = suggest(&server, &owner, &club, "Middlemarch").await;
        let (h, v) = auth_header(&outsider);

        server
            .get(&format!("/api/v1/clubs/{}/suggestions", club.id))
            .add_header(h.clone(), v.clone())
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .post(&format!("/api/v1/clubs/{}/suggestions/{}/vote", club.id, suggestion.id))
            .add_header(h, v)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_create_validation(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let server = create_test_app(pool);
        let club = club_with(&server, &owner, &[]).await;
        let (h, v) = auth_header(&owner);
        let path = format!("/api/v1/clubs/{}/suggestions", club.id);

        server
            .post(&path)
            .add_header(h.clone(), v.clone())
            .json(&json!({"title": "   "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post(&path)
            .add_header(h.clone(), v.clone())
            .json(&json!({"title": "Dune", "isbn": "12345"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let created: SuggestionResponse = server
            .post(&path)
            .add_header(h, v)
            .json(&json!({"title": "Dune", "isbn": "0-306-40615-2", "reason": "  Sand  "}))
            .await
            .json();
        assert_eq!(created.isbn13.as_deref(), Some("9780306406157"));
        assert_eq!(created.reason.as_deref(), Some("Sand"));
        assert_eq!(created.author, "");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_and_select_permissions(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let server = create_test_app(pool);
        let club = club_with(&server, &owner, &[&alice, &bob]).await;
        let alices = suggest(&server, &alice, &club, "Piranesi").await;
        let (owner_h, owner_v) = auth_header(&owner);
        let (alice_h, alice_v) = auth_header(&alice);
        let (bob_h, bob_v) = auth_header(&bob);

        // Members cannot pick the book or delete someone else's suggestion
        server
            .post(&format!("/api/v1/clubs/{}/suggestions/{}/select", club.id, alices.id))
            .add_header(alice_h.clone(), alice_v.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/v1/clubs/{}/suggestions/{}", club.id, alices.id))
            .add_header(bob_h, bob_v)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let selected: ClubResponse = server
            .post(&format!("/api/v1/clubs/{}/suggestions/{}/select", club.id, alices.id))
            .add_header(owner_h.clone(), owner_v.clone())
            .await
            .json();
        let current = selected.current_book.unwrap();
        assert_eq!(current.title, "Piranesi");
        assert_eq!(current.suggestion_id, Some(alices.id));

        server
            .delete(&format!("/api/v1/clubs/{}/suggestions/{}", club.id, alices.id))
            .add_header(alice_h, alice_v)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        // The club keeps its current book after the suggestion goes
        let club: ClubResponse = server
            .get(&format!("/api/v1/clubs/{}", club.id))
            .add_header(owner_h, owner_v)
            .await
            .json();
        assert_eq!(club.current_book.map(|b| b.title).as_deref(), Some("Piranesi"));
    }
}
