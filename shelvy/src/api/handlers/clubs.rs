use crate::AppState;
use crate::api::models::clubs::{
    ClubCreate, ClubMemberResponse, ClubResponse, ClubUpdate, InviteCreate, InviteResponse, JoinClubRequest, MemberRoleUpdate,
};
use crate::api::models::pagination::{PaginatedResponse, Pagination};
use crate::api::models::users::CurrentUser;
use crate::db::handlers::{Clubs, Repository, Users, clubs::ClubFilter};
use crate::db::models::clubs::{ClubCreateDBRequest, ClubInviteCreateDBRequest, ClubRole, ClubUpdateDBRequest};
use crate::email::{ClubInvite, EmailService};
use crate::errors::{Error, Result};
use crate::shelf::invite_code;
use crate::types::{ClubId, Operation, Resource, UserId, abbrev_uuid};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

const MAX_CLUB_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 2_000;

pub(crate) fn club_not_found(id: ClubId) -> Error {
    Error::NotFound {
        resource: "Club".to_string(),
        id: id.to_string(),
    }
}

/// The caller's role in a club. Non-members get 404 so private clubs stay invisible.
pub(crate) async fn require_member(conn: &mut PgConnection, club_id: ClubId, user: &CurrentUser) -> Result<ClubRole> {
    Clubs::new(conn)
        .member_role(club_id, user.id)
        .await?
        .ok_or_else(|| club_not_found(club_id))
}

/// Like [`require_member`], but only owners and admins pass.
pub(crate) async fn require_manager(
    conn: &mut PgConnection,
    club_id: ClubId,
    user: &CurrentUser,
    action: Operation,
    resource: Resource,
) -> Result<ClubRole> {
    let role = require_member(conn, club_id, user).await?;
    if !role.can_manage() {
        return Err(Error::InsufficientPermissions { action, resource });
    }
    Ok(role)
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_CLUB_NAME_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Club names must be 1-{MAX_CLUB_NAME_LENGTH} characters"),
        });
    }
    Ok(name.to_string())
}

fn validate_description(raw: Option<String>) -> Result<Option<String>> {
    let description = raw.map(|d| d.trim().to_string());
    if description.as_ref().is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
        return Err(Error::BadRequest {
            message: format!("Descriptions must be at most {MAX_DESCRIPTION_LENGTH} characters"),
        });
    }
    Ok(description)
}

#[utoipa::path(
    get,
    path = "/clubs",
    tag = "clubs",
    summary = "List my clubs",
    params(Pagination),
    responses(
        (status = 200, description = "Clubs the caller belongs to", body = PaginatedResponse<ClubResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_clubs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ClubResponse>>> {
    let (skip, limit) = pagination.params();
    let filter = ClubFilter::new(current_user.id, skip, limit);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Clubs::new(&mut tx);
    let clubs = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let mut data = Vec::with_capacity(clubs.len());
    for club in clubs {
        let role = repo.member_role(club.id, current_user.id).await?;
        data.push(ClubResponse::from(club).with_role(role));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

#[utoipa::path(
    post,
    path = "/clubs",
    tag = "clubs",
    summary = "Create a club",
    request_body = ClubCreate,
    responses(
        (status = 201, description = "Club created; the caller is its owner", body = ClubResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_club(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<ClubCreate>,
) -> Result<(StatusCode, Json<ClubResponse>)> {
    let request = ClubCreateDBRequest {
        name: validate_name(&create.name)?,
        description: validate_description(create.description)?.filter(|d| !d.is_empty()),
        owner_id: current_user.id,
        invite_code: invite_code(),
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let club = Clubs::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    tracing::info!(club_id = %abbrev_uuid(&club.id), "Club created");

    Ok((StatusCode::CREATED, Json(ClubResponse::from(club).with_role(Some(ClubRole::Owner)))))
}

#[utoipa::path(
    get,
    path = "/clubs/{id}",
    tag = "clubs",
    summary = "Get a club",
    responses(
        (status = 200, description = "Club details", body = ClubResponse),
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
pub async fn get_club(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<ClubId>) -> Result<Json<ClubResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let role = require_member(&mut pool_conn, id, &current_user).await?;
    let club = Clubs::new(&mut pool_conn).get_by_id(id).await?.ok_or_else(|| club_not_found(id))?;
    Ok(Json(ClubResponse::from(club).with_role(Some(role))))
}

#[utoipa::path(
    patch,
    path = "/clubs/{id}",
    tag = "clubs",
    summary = "Update a club",
    request_body = ClubUpdate,
    responses(
        (status = 200, description = "Club updated", body = ClubResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only owners and admins may edit the club"),
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
pub async fn update_club(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
    Json(update): Json<ClubUpdate>,
) -> Result<Json<ClubResponse>> {
    let request = ClubUpdateDBRequest {
        name: update.name.as_deref().map(validate_name).transpose()?,
        description: validate_description(update.description)?,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let role = require_manager(&mut tx, id, &current_user, Operation::UpdateAll, Resource::Clubs).await?;
    let club = Clubs::new(&mut tx).update(id, &request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ClubResponse::from(club).with_role(Some(role))))
}

#[utoipa::path(
    delete,
    path = "/clubs/{id}",
    tag = "clubs",
    summary = "Delete a club",
    responses(
        (status = 204, description = "Club deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the owner may delete the club"),
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
pub async fn delete_club(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<ClubId>) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if require_member(&mut pool_conn, id, &current_user).await? != ClubRole::Owner {
        return Err(Error::InsufficientPermissions {
            action: Operation::DeleteAll,
            resource: Resource::Clubs,
        });
    }

    if Clubs::new(&mut pool_conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(club_not_found(id))
    }
}

#[utoipa::path(
    post,
    path = "/clubs/join",
    tag = "clubs",
    summary = "Join a club by invite code",
    request_body = JoinClubRequest,
    responses(
        (status = 200, description = "Joined", body = ClubResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown invite code"),
        (status = 409, description = "Already a member"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn join_club(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<JoinClubRequest>,
) -> Result<Json<ClubResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Clubs::new(&mut tx);

    let club = repo
        .get_by_invite_code(request.invite_code.trim())
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Invite code".to_string(),
            id: request.invite_code.trim().to_string(),
        })?;
    repo.add_member(club.id, current_user.id, ClubRole::Member).await?;
    // Reload for the new member count
    let club = repo.get_by_id(club.id).await?.ok_or_else(|| club_not_found(club.id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ClubResponse::from(club).with_role(Some(ClubRole::Member))))
}

#[utoipa::path(
    post,
    path = "/clubs/{id}/leave",
    tag = "clubs",
    summary = "Leave a club",
    responses(
        (status = 204, description = "Left the club"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Club not found or not a member"),
        (status = 409, description = "The owner cannot leave"),
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
pub async fn leave_club(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<ClubId>) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if require_member(&mut pool_conn, id, &current_user).await? == ClubRole::Owner {
        return Err(Error::Conflict {
            message: "The owner cannot leave the club; delete it instead".to_string(),
        });
    }

    Clubs::new(&mut pool_conn).remove_member(id, current_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/clubs/{id}/members",
    tag = "clubs",
    summary = "List club members",
    responses(
        (status = 200, description = "Owner first, then admins, then members by join date", body = Vec<ClubMemberResponse>),
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
pub async fn list_members(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
) -> Result<Json<Vec<ClubMemberResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    require_member(&mut pool_conn, id, &current_user).await?;

    let members = Clubs::new(&mut pool_conn).list_members(id).await?;
    Ok(Json(members.into_iter().map(ClubMemberResponse::from).collect()))
}

/// Promote a member to admin or demote an admin. Ownership cannot be handed over.
#[utoipa::path(
    patch,
    path = "/clubs/{id}/members/{user_id}",
    tag = "clubs",
    summary = "Change a member's role",
    request_body = MemberRoleUpdate,
    responses(
        (status = 200, description = "Role changed", body = ClubMemberResponse),
        (status = 400, description = "Cannot assign or change the owner role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the owner may change roles"),
        (status = 404, description = "Club or member not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("user_id" = uuid::Uuid, Path, description = "Member's user ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_member_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, user_id)): Path<(ClubId, UserId)>,
    Json(update): Json<MemberRoleUpdate>,
) -> Result<Json<ClubMemberResponse>> {
    if update.role == ClubRole::Owner || user_id == current_user.id {
        return Err(Error::BadRequest {
            message: "The owner role cannot be assigned or given up".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    if require_member(&mut tx, id, &current_user).await? != ClubRole::Owner {
        return Err(Error::InsufficientPermissions {
            action: Operation::UpdateAll,
            resource: Resource::ClubMembers,
        });
    }
    let member = Clubs::new(&mut tx).set_member_role(id, user_id, update.role).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ClubMemberResponse::from(member)))
}

/// Owners may remove anyone but themselves; admins may remove plain members.
#[utoipa::path(
    delete,
    path = "/clubs/{id}/members/{user_id}",
    tag = "clubs",
    summary = "Remove a member",
    responses(
        (status = 204, description = "Member removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to remove this member"),
        (status = 404, description = "Club or member not found"),
        (status = 409, description = "The owner cannot be removed"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Club ID"),
        ("user_id" = uuid::Uuid, Path, description = "Member's user ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn remove_member(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((id, user_id)): Path<(ClubId, UserId)>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let my_role = require_manager(&mut tx, id, &current_user, Operation::DeleteAll, Resource::ClubMembers).await?;

    let mut repo = Clubs::new(&mut tx);
    let target_role = repo.member_role(id, user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Club member".to_string(),
        id: user_id.to_string(),
    })?;
    match (my_role, target_role) {
        (_, ClubRole::Owner) => {
            return Err(Error::Conflict {
                message: "The club owner cannot be removed".to_string(),
            });
        }
        (ClubRole::Admin, ClubRole::Admin) => {
            return Err(Error::InsufficientPermissions {
                action: Operation::DeleteAll,
                resource: Resource::ClubMembers,
            });
        }
        _ => {}
    }

    repo.remove_member(id, user_id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/clubs/{id}/invites",
    tag = "clubs",
    summary = "List sent invites",
    responses(
        (status = 200, description = "Invites, newest first", body = Vec<InviteResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only owners and admins see invites"),
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
pub async fn list_invites(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
) -> Result<Json<Vec<InviteResponse>>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    require_manager(&mut pool_conn, id, &current_user, Operation::ReadAll, Resource::Clubs).await?;

    let mut repo = Clubs::new(&mut pool_conn);
    let club = repo.get_by_id(id).await?.ok_or_else(|| club_not_found(id))?;
    let invite_url = state.config.invite_url(&club.invite_code);
    let invites = repo.list_invites(id).await?;

    Ok(Json(
        invites.into_iter().map(|invite| InviteResponse::new(invite, invite_url.clone())).collect(),
    ))
}

/// Record an invite and email the join link. The invite is only kept if the email was handed to
/// the mail transport.
#[utoipa::path(
    post,
    path = "/clubs/{id}/invites",
    tag = "clubs",
    summary = "Invite someone by email",
    request_body = InviteCreate,
    responses(
        (status = 201, description = "Invite sent", body = InviteResponse),
        (status = 400, description = "Invalid email address"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only owners and admins may invite"),
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
pub async fn create_invite(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<ClubId>,
    Json(create): Json<InviteCreate>,
) -> Result<(StatusCode, Json<InviteResponse>)> {
    let email = create.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }

    let (club, inviter) = {
        let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        require_manager(&mut pool_conn, id, &current_user, Operation::CreateOwn, Resource::ClubMembers).await?;
        let inviter = Users::new(&mut pool_conn)
            .get_by_id(current_user.id)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;
        let club = Clubs::new(&mut pool_conn).get_by_id(id).await?.ok_or_else(|| club_not_found(id))?;
        (club, inviter)
    };

    // Recorded only once the mail is sent; no connection is held meanwhile
    let invite_url = state.config.invite_url(&club.invite_code);
    let email_service = EmailService::new(&state.config)?;
    email_service
        .send_club_invite(
            &email,
            &ClubInvite {
                club_name: &club.name,
                inviter_name: inviter.display_name.as_deref().unwrap_or(&inviter.username),
                invite_code: &club.invite_code,
                invite_url: &invite_url,
            },
        )
        .await?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let invite = Clubs::new(&mut pool_conn)
        .create_invite(&ClubInviteCreateDBRequest {
            club_id: id,
            email: email.clone(),
            invited_by: current_user.id,
        })
        .await?;
    tracing::info!(club_id = %abbrev_uuid(&id), "Club invite sent");

    Ok((StatusCode::CREATED, Json(InviteResponse::new(invite, invite_url))))
}
