//! Database repository for book clubs, their members and invites.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::clubs::{
        ClubCreateDBRequest, ClubDBResponse, ClubInviteCreateDBRequest, ClubInviteDBResponse, ClubMemberDBResponse, ClubRole,
        ClubUpdateDBRequest, CurrentBookDBRequest,
    },
};
use crate::types::{ClubId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const CLUB_SELECT: &str = r#"
    SELECT c.*, (SELECT COUNT(*) FROM club_members m WHERE m.club_id = c.id) AS member_count
    FROM clubs c
"#;

const MEMBER_SELECT: &str = r#"
    SELECT m.club_id, m.user_id, m.role, m.joined_at, u.username, u.display_name, u.avatar_url
    FROM club_members m
    JOIN users u ON u.id = m.user_id
"#;

/// Filter for listing the clubs one reader belongs to
#[derive(Debug, Clone)]
pub struct ClubFilter {
    pub member_id: UserId,
    pub skip: i64,
    pub limit: i64,
}

impl ClubFilter {
    pub fn new(member_id: UserId, skip: i64, limit: i64) -> Self {
        Self { member_id, skip, limit }
    }
}

pub struct Clubs<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Clubs<'c> {
    type CreateRequest = ClubCreateDBRequest;
    type UpdateRequest = ClubUpdateDBRequest;
    type Response = ClubDBResponse;
    type Id = ClubId;
    type Filter = ClubFilter;

    /// Inserts the club and its owner's membership. Run inside a transaction so the two land
    /// together.
    #[instrument(skip(self, request), fields(owner = %abbrev_uuid(&request.owner_id), name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let club_id: ClubId = sqlx::query_scalar(
            r#"
            INSERT INTO clubs (id, name, description, owner_id, invite_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.owner_id)
        .bind(&request.invite_code)
        .fetch_one(&mut *self.db)
        .await?;

        self.add_member(club_id, request.owner_id, ClubRole::Owner).await?;

        self.get_by_id(club_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let club = sqlx::query_as::<_, ClubDBResponse>(&format!("{CLUB_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(club)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<ClubId>) -> Result<HashMap<Self::Id, ClubDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let clubs = sqlx::query_as::<_, ClubDBResponse>(&format!("{CLUB_SELECT} WHERE c.id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(clubs.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Clubs the reader is a member of, most recently joined first.
    #[instrument(skip(self, filter), fields(member = %abbrev_uuid(&filter.member_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let clubs = sqlx::query_as::<_, ClubDBResponse>(&format!(
            r#"{CLUB_SELECT}
            JOIN club_members me ON me.club_id = c.id AND me.user_id = $1
            ORDER BY me.joined_at DESC
            LIMIT $2 OFFSET $3"#
        ))
        .bind(filter.member_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(clubs)
    }

    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clubs WHERE id = $1").bind(id).execute(&mut *self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(club_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let result = sqlx::query(
            r#"
            UPDATE clubs SET
                name = COALESCE($2, name),
                description = CASE WHEN $3::text IS NULL THEN description ELSE NULLIF($3, '') END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.description)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

impl<'c> Clubs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, filter), fields(member = %abbrev_uuid(&filter.member_id)), err)]
    pub async fn count(&mut self, filter: &ClubFilter) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM club_members WHERE user_id = $1")
            .bind(filter.member_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }

    /// Invite codes are matched case-insensitively.
    #[instrument(skip(self, code), err)]
    pub async fn get_by_invite_code(&mut self, code: &str) -> Result<Option<ClubDBResponse>> {
        let club = sqlx::query_as::<_, ClubDBResponse>(&format!("{CLUB_SELECT} WHERE c.invite_code = upper($1)"))
            .bind(code.trim())
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(club)
    }

    /// The reader's role in the club, or `None` when they are not a member.
    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn member_role(&mut self, club_id: ClubId, user_id: UserId) -> Result<Option<ClubRole>> {
        let role = sqlx::query_scalar("SELECT role FROM club_members WHERE club_id = $1 AND user_id = $2")
            .bind(club_id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(role)
    }

    /// Fails with a unique violation on `club_members_pkey` when already a member.
    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn add_member(&mut self, club_id: ClubId, user_id: UserId, role: ClubRole) -> Result<()> {
        sqlx::query("INSERT INTO club_members (club_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(club_id)
            .bind(user_id)
            .bind(role)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn remove_member(&mut self, club_id: ClubId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM club_members WHERE club_id = $1 AND user_id = $2")
            .bind(club_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Owner first, then admins, then members by join date.
    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id)), err)]
    pub async fn list_members(&mut self, club_id: ClubId) -> Result<Vec<ClubMemberDBResponse>> {
        let members = sqlx::query_as::<_, ClubMemberDBResponse>(&format!(
            "{MEMBER_SELECT} WHERE m.club_id = $1 ORDER BY m.role ASC, m.joined_at ASC"
        ))
        .bind(club_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(members)
    }

    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn set_member_role(&mut self, club_id: ClubId, user_id: UserId, role: ClubRole) -> Result<ClubMemberDBResponse> {
        let result = sqlx::query("UPDATE club_members SET role = $3 WHERE club_id = $1 AND user_id = $2")
            .bind(club_id)
            .bind(user_id)
            .bind(role)
            .execute(&mut *self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        let member = sqlx::query_as::<_, ClubMemberDBResponse>(&format!("{MEMBER_SELECT} WHERE m.club_id = $1 AND m.user_id = $2"))
            .bind(club_id)
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(member)
    }

    #[instrument(skip(self, book), fields(club_id = %abbrev_uuid(&club_id), suggestion_id = %abbrev_uuid(&book.suggestion_id)), err)]
    pub async fn set_current_book(&mut self, club_id: ClubId, book: &CurrentBookDBRequest) -> Result<ClubDBResponse> {
        let result = sqlx::query(
            r#"
            UPDATE clubs SET
                current_suggestion_id = $2,
                current_book_title = $3,
                current_book_author = $4,
                current_book_cover_url = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(club_id)
        .bind(book.suggestion_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.cover_url)
        .execute(&mut *self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        self.get_by_id(club_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self, request), fields(club_id = %abbrev_uuid(&request.club_id)), err)]
    pub async fn create_invite(&mut self, request: &ClubInviteCreateDBRequest) -> Result<ClubInviteDBResponse> {
        let invite = sqlx::query_as::<_, ClubInviteDBResponse>(
            r#"
            INSERT INTO club_invites (id, club_id, email, invited_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.club_id)
        .bind(&request.email)
        .bind(request.invited_by)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(invite)
    }

    #[instrument(skip(self), fields(club_id = %abbrev_uuid(&club_id)), err)]
    pub async fn list_invites(&mut self, club_id: ClubId) -> Result<Vec<ClubInviteDBResponse>> {
        let invites = sqlx::query_as::<_, ClubInviteDBResponse>("SELECT * FROM club_invites WHERE club_id = $1 ORDER BY created_at DESC")
            .bind(club_id)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(invites)
    }
}
