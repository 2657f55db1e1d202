//! Unauthenticated views.

use crate::AppState;
use crate::api::models::books::BookResponse;
use crate::api::models::shelf::{PublicShelfResponse, PublicShelfSettings};
use crate::api::models::users::UserSummary;
use crate::db::handlers::{Books, Repository, ShelfSettings, Users};
use crate::db::models::books::BookStatus;
use crate::errors::{Error, Result};
use crate::shelf::sort::sort_books;
use axum::{
    Json,
    extract::{Path, State},
};

/// A shared shelf, laid out the way its owner sees it. Unknown and private slugs are both 404.
#[utoipa::path(
    get,
    path = "/public/shelves/{slug}",
    tag = "public",
    summary = "View a shared shelf",
    responses(
        (status = 200, description = "Public shelf", body = PublicShelfResponse),
        (status = 404, description = "No public shelf with this link"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("slug" = String, Path, description = "Share slug")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_public_shelf(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<PublicShelfResponse>> {
    let not_found = || Error::NotFound {
        resource: "Shelf".to_string(),
        id: slug.clone(),
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let settings = ShelfSettings::new(&mut tx).get_public_by_slug(&slug).await?.ok_or_else(not_found)?;
    let owner = Users::new(&mut tx).get_by_id(settings.user_id).await?.ok_or_else(not_found)?;
    let mut books = Books::new(&mut tx).list_all_for_user(owner.id, None).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if !settings.show_want_to_read {
        books.retain(|b| b.status != BookStatus::WantToRead);
    }
    sort_books(&mut books, settings.sort_order, i64::from(settings.random_seed));

    let bio = owner.bio.clone();
    Ok(Json(PublicShelfResponse {
        owner: UserSummary::from(owner),
        bio,
        settings: PublicShelfSettings::from(&settings),
        books: books.into_iter().map(BookResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::shelf::{PublicShelfResponse, ShareResponse};
    use crate::db::models::books::BookStatus;
    use crate::test_utils::{auth_header, create_test_app, create_test_book_with_status, create_test_user};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_shelf_visibility(pool: PgPool) {
        let owner = create_test_user(&pool, "owner").await;
        create_test_book_with_status(&pool, owner.id, "Dune", BookStatus::Read).await;
        create_test_book_with_status(&pool, owner.id, "Anathem", BookStatus::WantToRead).await;
        let server = create_test_app(pool);
        let (name, value) = auth_header(&owner);

        server.get("/public/shelves/nosuchslug").await.assert_status(StatusCode::NOT_FOUND);

        let shared: ShareResponse = server.post("/api/v1/shelf/share").add_header(name.clone(), value.clone()).await.json();
        let path = format!("/public/shelves/{}", shared.share_slug.unwrap());

        // No credentials needed
        let shelf: PublicShelfResponse = server.get(&path).await.json();
        assert_eq!(shelf.owner.username, "owner");
        assert_eq!(shelf.books.len(), 2);

        // Want-to-read books drop out once hidden
        server
            .put("/api/v1/shelf/settings")
            .add_header(name.clone(), value.clone())
            .json(&json!({"sort_order": "title", "show_want_to_read": false}))
            .await
            .assert_status_ok();
        let shelf: PublicShelfResponse = server.get(&path).await.json();
        assert_eq!(shelf.books.len(), 1);
        assert_eq!(shelf.books[0].title, "Dune");

        server.delete("/api/v1/shelf/share").add_header(name, value).await.assert_status_ok();
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }
}
