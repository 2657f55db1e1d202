use crate::AppState;
use crate::api::models::books::{
    BookCreate, BookResponse, BookUpdate, EnrichResponse, ListBooksQuery, ReorderRequest, ReorderResponse, validate_rating,
};
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::users::CurrentUser;
use crate::backfill;
use crate::db::handlers::{Books, Repository, ShelfSettings};
use crate::db::models::books::{BookCreateDBRequest, BookDBResponse, BookStatus, BookUpdateDBRequest, reading_dates_after};
use crate::errors::{Error, Result};
use crate::metadata::{BookMetadata, MetadataService};
use crate::shelf::covers::normalize_cover_url;
use crate::shelf::isbn::Isbn;
use crate::shelf::sort::sort_books;
use crate::types::{BookId, Operation, Resource, abbrev_uuid};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::PgConnection;
use std::collections::HashSet;

pub(crate) fn book_not_found(id: BookId) -> Error {
    Error::NotFound {
        resource: "Book".to_string(),
        id: id.to_string(),
    }
}

/// Load a book the caller may look at: their own, or one on a shelf that is public or whose owner
/// they follow. Anything else is reported as missing.
pub(crate) async fn load_visible_book(conn: &mut PgConnection, id: BookId, viewer: &CurrentUser) -> Result<BookDBResponse> {
    let book = Books::new(&mut *conn).get_by_id(id).await?.ok_or_else(|| book_not_found(id))?;
    if !Books::new(&mut *conn).is_visible_to(book.user_id, viewer.id).await? {
        return Err(book_not_found(id));
    }
    Ok(book)
}

/// Load a book the caller owns. Visible books of other readers give 403, hidden ones 404.
pub(crate) async fn load_owned_book(conn: &mut PgConnection, id: BookId, owner: &CurrentUser, action: Operation) -> Result<BookDBResponse> {
    let book = load_visible_book(conn, id, owner).await?;
    if book.user_id != owner.id {
        return Err(Error::InsufficientPermissions {
            action,
            resource: Resource::Books,
        });
    }
    Ok(book)
}

/// Trim a user-supplied cover URL. Blank stays blank so updates can clear the column.
fn clean_cover_url(raw: Option<String>) -> Result<Option<String>> {
    match raw {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(Some(String::new())),
        Some(raw) => normalize_cover_url(&raw).map(Some).ok_or_else(|| Error::BadRequest {
            message: "Cover must be an http(s) URL".to_string(),
        }),
    }
}

fn clean_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn clean_categories(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(c.to_lowercase()))
        .collect()
}

/// Metadata for a book being added, looked up by ISBN when one was given. Provider outages do not
/// block adding the book.
async fn autofill_metadata(
    metadata: &MetadataService,
    isbn: Option<&Isbn>,
    title: &str,
    author: &str,
) -> Option<BookMetadata> {
    let found = match isbn.and_then(Isbn::preferred) {
        Some(key) => metadata.lookup_isbn(key).await,
        None => metadata.find_by_title(title, author).await,
    };
    match found {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "Autofill lookup failed, saving book without it");
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    summary = "List my shelf",
    params(ListBooksQuery),
    responses(
        (status = 200, description = "Books in shelf order", body = PaginatedResponse<BookResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_books(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<PaginatedResponse<BookResponse>>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let settings = ShelfSettings::new(&mut tx).get_or_create(current_user.id).await?;
    let mut books = Books::new(&mut tx).list_all_for_user(current_user.id, query.status).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let order = query.sort.unwrap_or(settings.sort_order);
    let seed = query.seed.unwrap_or(i64::from(settings.random_seed));
    sort_books(&mut books, order, seed);

    let total = books.len() as i64;
    let (skip, limit) = query.pagination.params();
    let page = query.pagination.page_of(books);

    Ok(Json(PaginatedResponse::new(
        page.into_iter().map(BookResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    summary = "Add a book",
    request_body = BookCreate,
    responses(
        (status = 201, description = "Book added", body = BookResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Book already on the shelf"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_book(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(create): Json<BookCreate>,
) -> Result<(StatusCode, Json<BookResponse>)> {
    let title = create.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::BadRequest {
            message: "Title is required".to_string(),
        });
    }
    validate_rating(create.rating)?;

    let isbn = match clean_text(create.isbn) {
        Some(raw) => Some(Isbn::parse(&raw).ok_or_else(|| Error::BadRequest {
            message: format!("'{raw}' is not a valid ISBN"),
        })?),
        None => None,
    };
    let cover_url = clean_cover_url(create.cover_url)?.filter(|c| !c.is_empty());
    let mut author = clean_text(create.author).unwrap_or_default();

    let mut request = BookCreateDBRequest {
        user_id: current_user.id,
        title,
        author: String::new(),
        isbn13: isbn.as_ref().and_then(|i| i.isbn13.clone()),
        isbn10: isbn.as_ref().and_then(|i| i.isbn10.clone()),
        google_books_id: clean_text(create.google_books_id),
        cover_url,
        description: clean_text(create.description),
        page_count: create.page_count.filter(|p| *p > 0),
        published_date: clean_text(create.published_date),
        publisher: clean_text(create.publisher),
        categories: clean_categories(create.categories.unwrap_or_default()),
        status: create.status.unwrap_or(BookStatus::WantToRead),
        rating: create.rating,
        started_at: None,
        finished_at: None,
        metadata_attempted: false,
    };

    if create.autofill && !state.metadata.is_empty() {
        request.metadata_attempted = true;
        if let Some(found) = autofill_metadata(&state.metadata, isbn.as_ref(), &request.title, &author).await {
            if author.is_empty() {
                author = found.author();
            }
            request.isbn13 = request.isbn13.take().or(found.isbn13);
            request.isbn10 = request.isbn10.take().or(found.isbn10);
            request.google_books_id = request.google_books_id.take().or(found.google_books_id);
            request.cover_url = request.cover_url.take().or(found.cover_url);
            request.description = request.description.take().or(found.description);
            request.page_count = request.page_count.or(found.page_count);
            request.published_date = request.published_date.take().or(found.published_date);
            request.publisher = request.publisher.take().or(found.publisher);
            if request.categories.is_empty() {
                request.categories = found.categories;
            }
        }
    }
    request.author = author;

    let now = Utc::now();
    let (started_at, finished_at) = reading_dates_after(BookStatus::WantToRead, request.status, None, None, now);
    request.started_at = started_at;
    request.finished_at = finished_at;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let book = Books::new(&mut pool_conn).create(&request).await?;
    tracing::debug!(book_id = %abbrev_uuid(&book.id), "Book added");

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    summary = "Get a book",
    responses(
        (status = 200, description = "Book details", body = BookResponse),
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
pub async fn get_book(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<BookId>) -> Result<Json<BookResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let book = load_visible_book(&mut pool_conn, id, &current_user).await?;
    Ok(Json(BookResponse::from(book)))
}

/// Update a book. Changing `status` stamps or clears the reading dates unless they are given
/// explicitly in the same request.
#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "books",
    summary = "Update a book",
    request_body = BookUpdate,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your book"),
        (status = 404, description = "Book not found"),
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
pub async fn update_book(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<BookId>,
    Json(update): Json<BookUpdate>,
) -> Result<Json<BookResponse>> {
    validate_rating(update.rating.flatten())?;
    let title = update.title.map(|t| t.trim().to_string());
    if title.as_deref().is_some_and(str::is_empty) {
        return Err(Error::BadRequest {
            message: "Title must not be empty".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let book = load_owned_book(&mut tx, id, &current_user, Operation::UpdateOwn).await?;

    let mut request = BookUpdateDBRequest {
        title,
        author: update.author.map(|a| a.trim().to_string()),
        cover_url: clean_cover_url(update.cover_url)?,
        description: update.description.map(|d| d.trim().to_string()),
        page_count: update.page_count.filter(|p| *p > 0),
        published_date: clean_text(update.published_date),
        publisher: clean_text(update.publisher),
        categories: update.categories.map(clean_categories),
        status: update.status,
        rating: update.rating,
        started_at: update.started_at,
        finished_at: update.finished_at,
    };

    if let Some(next) = update.status {
        let (started_at, finished_at) = reading_dates_after(book.status, next, book.started_at, book.finished_at, Utc::now());
        request.started_at = request.started_at.or(Some(started_at));
        request.finished_at = request.finished_at.or(Some(finished_at));
    }

    let updated = Books::new(&mut tx).update(id, &request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(BookResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    summary = "Remove a book",
    responses(
        (status = 204, description = "Book removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your book"),
        (status = 404, description = "Book not found"),
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
pub async fn delete_book(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<BookId>) -> Result<StatusCode> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_owned_book(&mut pool_conn, id, &current_user, Operation::DeleteOwn).await?;

    if Books::new(&mut pool_conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(book_not_found(id))
    }
}

/// Look the book up with the metadata providers and fill whatever is still empty.
#[utoipa::path(
    post,
    path = "/books/{id}/enrich",
    tag = "books",
    summary = "Enrich a book with metadata",
    responses(
        (status = 200, description = "Lookup finished; `filled` lists the fields that gained a value", body = EnrichResponse),
        (status = 400, description = "No metadata providers configured"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your book"),
        (status = 404, description = "Book not found"),
        (status = 502, description = "All metadata providers failed"),
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
pub async fn enrich_book(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<BookId>) -> Result<Json<EnrichResponse>> {
    if state.metadata.is_empty() {
        return Err(Error::BadRequest {
            message: "No book metadata providers are configured".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let book = load_owned_book(&mut pool_conn, id, &current_user, Operation::UpdateOwn).await?;

    let response = match backfill::enrich_book(&mut pool_conn, &state.metadata, &book).await? {
        Some(enrichment) => EnrichResponse {
            book: BookResponse::from(enrichment.book),
            filled: enrichment.filled.into_iter().map(str::to_string).collect(),
        },
        None => EnrichResponse {
            book: BookResponse::from(book),
            filled: vec![],
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/books/order",
    tag = "books",
    summary = "Set manual shelf order",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Positions updated", body = ReorderResponse),
        (status = 400, description = "Duplicate book IDs"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reorder_books(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>> {
    let unique: HashSet<_> = request.book_ids.iter().collect();
    if unique.len() != request.book_ids.len() {
        return Err(Error::BadRequest {
            message: "Each book may appear only once".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Books::new(&mut pool_conn).set_positions(current_user.id, &request.book_ids).await?;
    Ok(Json(ReorderResponse { updated }))
}
