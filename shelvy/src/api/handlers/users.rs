use crate::AppState;
use crate::api::handlers::auth::clear_session_cookie;
use crate::api::models::auth::{AuthSuccessResponse, LogoutResponse};
use crate::api::models::pagination::{PaginatedResponse, Pagination};
use crate::api::models::users::{
    CurrentUser, FollowResponse, FollowStatusResponse, ProfileCounts, ProfileResponse, SearchUsersQuery, UserResponse, UserSummary,
    UserUpdate, normalize_username,
};
use crate::db::handlers::{Books, Follows, Repository, Users};
use crate::db::models::users::UserUpdateDBRequest;
use crate::errors::{Error, Result};
use crate::types::UserId;
use axum::{
    Json,
    extract::{Path, Query, State},
};

const MAX_BIO_LENGTH: usize = 500;

fn user_not_found(id: impl ToString) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    summary = "Get current user",
    responses(
        (status = 200, description = "The caller's account", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    // A valid token for a deleted account is treated as signed out
    let user = Users::new(&mut pool_conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    summary = "Update current user",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    let username = update.username.as_deref().map(normalize_username).transpose()?;
    if let Some(bio) = &update.bio
        && bio.chars().count() > MAX_BIO_LENGTH
    {
        return Err(Error::BadRequest {
            message: format!("Bio must be at most {MAX_BIO_LENGTH} characters"),
        });
    }
    let avatar_url = update.avatar_url.map(|url| url.trim().to_string());
    if let Some(url) = &avatar_url
        && !url.is_empty()
        && url::Url::parse(url).is_err()
    {
        return Err(Error::BadRequest {
            message: "Avatar must be an absolute URL".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut pool_conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                username,
                display_name: update.display_name.map(|n| n.trim().to_string()),
                avatar_url,
                bio: update.bio.map(|b| b.trim().to_string()),
                password_hash: None,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete the caller's account. Books, follows, notes, comments, likes, club memberships and
/// owned clubs go with it.
#[utoipa::path(
    delete,
    path = "/users/me",
    tag = "users",
    summary = "Delete current user",
    responses(
        (status = 200, description = "Account deleted and session cleared", body = AuthSuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<LogoutResponse> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Users::new(&mut pool_conn).delete(current_user.id).await? {
        return Err(Error::Unauthenticated { message: None });
    }
    tracing::info!(user_id = %current_user.id, "Account deleted");

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Account deleted".to_string(),
        },
        cookie: clear_session_cookie(&state.config),
    })
}

#[utoipa::path(
    get,
    path = "/users/search",
    tag = "users",
    summary = "Search readers",
    params(SearchUsersQuery),
    responses(
        (status = 200, description = "Matching readers", body = PaginatedResponse<UserSummary>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<PaginatedResponse<UserSummary>>> {
    let (skip, limit) = query.pagination.params();
    if query.q.trim().is_empty() {
        return Ok(Json(PaginatedResponse::new(vec![], 0, skip, limit)));
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let (users, total) = Users::new(&mut pool_conn).search(&query.q, current_user.id, skip, limit).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserSummary::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/users/{username}",
    tag = "users",
    summary = "Get reader profile",
    responses(
        (status = 200, description = "Public profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Reader not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("username" = String, Path, description = "Username")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut tx)
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| user_not_found(&username))?;

    let counts = Follows::new(&mut tx).profile_counts(user.id).await?;
    let is_self = user.id == current_user.id;
    let is_following = !is_self && Follows::new(&mut tx).is_following(current_user.id, user.id).await?;
    let can_view_shelf = Books::new(&mut tx).is_visible_to(user.id, current_user.id).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ProfileResponse::new(
        user,
        ProfileCounts::from(counts),
        is_following,
        is_self,
        can_view_shelf,
    )))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/follow",
    tag = "users",
    summary = "Follow a reader",
    responses(
        (status = 200, description = "Now following", body = FollowStatusResponse),
        (status = 400, description = "Cannot follow yourself"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Reader not found"),
        (status = 409, description = "Already following"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("user_id" = uuid::Uuid, Path, description = "Reader to follow")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn follow_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<FollowStatusResponse>> {
    if user_id == current_user.id {
        return Err(Error::BadRequest {
            message: "You cannot follow yourself".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    if Users::new(&mut tx).get_by_id(user_id).await?.is_none() {
        return Err(user_not_found(user_id));
    }
    if !Follows::new(&mut tx).follow(current_user.id, user_id).await? {
        return Err(Error::Conflict {
            message: "You already follow this reader".to_string(),
        });
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(FollowStatusResponse { following: true }))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/follow",
    tag = "users",
    summary = "Unfollow a reader",
    responses(
        (status = 200, description = "No longer following", body = FollowStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not following this reader"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("user_id" = uuid::Uuid, Path, description = "Reader to unfollow")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn unfollow_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<FollowStatusResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Follows::new(&mut pool_conn).unfollow(current_user.id, user_id).await? {
        return Err(Error::NotFound {
            resource: "Follow".to_string(),
            id: user_id.to_string(),
        });
    }
    Ok(Json(FollowStatusResponse { following: false }))
}

#[derive(Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

async fn list_follows(
    state: &AppState,
    user_id: UserId,
    direction: Direction,
    pagination: &Pagination,
) -> Result<PaginatedResponse<FollowResponse>> {
    let (skip, limit) = pagination.params();
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut tx).get_by_id(user_id).await?.is_none() {
        return Err(user_not_found(user_id));
    }
    let counts = Follows::new(&mut tx).profile_counts(user_id).await?;
    let (rows, total) = match direction {
        Direction::Followers => (Follows::new(&mut tx).followers(user_id, skip, limit).await?, counts.followers_count),
        Direction::Following => (Follows::new(&mut tx).following(user_id, skip, limit).await?, counts.following_count),
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(PaginatedResponse::new(
        rows.into_iter().map(FollowResponse::from).collect(),
        total,
        skip,
        limit,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/followers",
    tag = "users",
    summary = "List a reader's followers",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Reader ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "Followers, most recent first", body = PaginatedResponse<FollowResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Reader not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_followers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<FollowResponse>>> {
    Ok(Json(list_follows(&state, user_id, Direction::Followers, &pagination).await?))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/following",
    tag = "users",
    summary = "List readers a reader follows",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Reader ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "Followed readers, most recent first", body = PaginatedResponse<FollowResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Reader not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_following(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<FollowResponse>>> {
    Ok(Json(list_follows(&state, user_id, Direction::Following, &pagination).await?))
}

#[utoipa::path(
    get,
    path = "/users/me/followers",
    tag = "users",
    summary = "List my followers",
    params(Pagination),
    responses(
        (status = 200, description = "Followers, most recent first", body = PaginatedResponse<FollowResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_my_followers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<FollowResponse>>> {
    Ok(Json(list_follows(&state, current_user.id, Direction::Followers, &pagination).await?))
}

#[utoipa::path(
    get,
    path = "/users/me/following",
    tag = "users",
    summary = "List readers I follow",
    params(Pagination),
    responses(
        (status = 200, description = "Followed readers, most recent first", body = PaginatedResponse<FollowResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_my_following(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<FollowResponse>>> {
    Ok(Json(list_follows(&state, current_user.id, Direction::Following, &pagination).await?))
}
