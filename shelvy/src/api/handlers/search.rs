use crate::AppState;
use crate::api::models::search::SearchBooksQuery;
use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};
use crate::metadata::BookMetadata;
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// Search the metadata providers. The first provider with results answers.
#[utoipa::path(
    get,
    path = "/search/books",
    tag = "search",
    summary = "Search books",
    params(SearchBooksQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookMetadata>),
        (status = 400, description = "Empty query"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "All metadata providers failed"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn search_books(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SearchBooksQuery>,
) -> Result<Json<Vec<BookMetadata>>> {
    let results = state.metadata.search(&query.q, query.limit()).await?;
    Ok(Json(results))
}

/// Look a book up by ISBN-10 or ISBN-13. Answers from every provider are merged.
#[utoipa::path(
    get,
    path = "/search/isbn/{isbn}",
    tag = "search",
    summary = "Look up an ISBN",
    responses(
        (status = 200, description = "Book metadata", body = BookMetadata),
        (status = 400, description = "Not a valid ISBN"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No provider knows this ISBN"),
        (status = 502, description = "All metadata providers failed"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13, hyphens allowed")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn lookup_isbn(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(isbn): Path<String>,
) -> Result<Json<BookMetadata>> {
    state.metadata.lookup_isbn(&isbn).await?.map(Json).ok_or(Error::NotFound {
        resource: "ISBN".to_string(),
        id: isbn,
    })
}

#[cfg(test)]
mod tests {
    use crate::metadata::tests::{FakeProvider, meta};
    use crate::metadata::{BookMetadata, MetadataService};
    use crate::test_utils::{auth_header, create_test_server, create_test_state_with_metadata, create_test_user};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_falls_through_empty_provider(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let metadata = MetadataService::new(vec![
            FakeProvider::returning("empty", vec![], None),
            FakeProvider::returning("full", vec![meta("full", "Dune"), meta("full", "Dune Messiah")], None),
        ]);
        let server = create_test_server(create_test_state_with_metadata(pool, metadata));
        let (name, value) = auth_header(&user);

        let results: Vec<BookMetadata> = server
            .get("/api/v1/search/books")
            .add_query_param("q", "dune")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "full");
    }

    #[sqlx::test]
    async fn test_search_all_providers_failing_is_bad_gateway(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let metadata = MetadataService::new(vec![FakeProvider::failing("down")]);
        let server = create_test_server(create_test_state_with_metadata(pool, metadata));
        let (name, value) = auth_header(&user);

        server
            .get("/api/v1/search/books")
            .add_query_param("q", "dune")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::BAD_GATEWAY);
    }

    #[sqlx::test]
    async fn test_isbn_lookup(pool: PgPool) {
        let user = create_test_user(&pool, "reader").await;
        let found = BookMetadata {
            page_count: Some(412),
            ..meta("fake", "Dune")
        };
        let metadata = MetadataService::new(vec![FakeProvider::returning("fake", vec![], Some(found))]);
        let server = create_test_server(create_test_state_with_metadata(pool, metadata));
        let (name, value) = auth_header(&user);

        let book: BookMetadata = server
            .get("/api/v1/search/isbn/0-306-40615-2")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(book.isbn13.as_deref(), Some("9780306406157"));
        assert_eq!(book.page_count, Some(412));

        // The fake answers once; a second lookup finds nothing
        server
            .get("/api/v1/search/isbn/9780306406157")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .get("/api/v1/search/isbn/12345")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
