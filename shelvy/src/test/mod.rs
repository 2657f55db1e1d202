//! End-to-end tests that drive a fully assembled [`crate::Application`] over HTTP.

use crate::api::models::auth::AuthResponse;
use crate::api::models::books::BookResponse;
use crate::api::models::clubs::ClubResponse;
use crate::api::models::engagement::{CommentResponse, LikeResponse};
use crate::api::models::shelf::{FeedEntryResponse, PublicShelfResponse, ShareResponse};
use crate::api::models::suggestions::SuggestionResponse;
use crate::api::models::users::ProfileResponse;
use crate::db::models::books::BookStatus;
use crate::metadata::BookMetadata;
use crate::test_utils::create_test_config;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::json;
use sqlx::{ConnectOptions, PgPool};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn volume_json() -> serde_json::Value {
    json!({
        "totalItems": 1,
        "items": [{
            "id": "B1hSG45JCX4C",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publisher": "Ace",
                "publishedDate": "1990-09-01",
                "description": "Set on the desert planet Arrakis...",
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0441172717"},
                    {"type": "ISBN_13", "identifier": "9780441172719"}
                ],
                "pageCount": 535,
                "categories": ["Fiction / Science Fiction / General"],
                "imageLinks": {"thumbnail": "http://books.google.com/books/content?id=B1hSG45JCX4C&img=1&zoom=1&edge=curl"}
            }
        }]
    })
}

/// An application whose only metadata provider is Google Books, served by `mock`.
async fn start_app(pool: &PgPool, mock: &MockServer) -> (TestServer, crate::BackgroundServices) {
    let mut config = create_test_config();
    config.database.url = pool.connect_options().to_url_lossy().to_string();
    config.metadata.google_books.enabled = true;
    config.metadata.google_books.base_url = format!("{}/", mock.uri()).parse().expect("mock URL");

    let app = crate::Application::new(config).await.expect("Failed to create application");
    app.into_test_server()
}

async fn register(server: &TestServer, username: &str) -> (HeaderName, HeaderValue) {
    let response = server
        .post("/authentication/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse battery",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let auth: AuthResponse = response.json();
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", auth.token)).expect("token is a valid header"),
    )
}

/// A reader builds a shelf from catalogue data, shares it, and a follower engages with it.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_shelf_journey(pool: PgPool) {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume_json()))
        .mount(&mock)
        .await;
    let (server, bg_services) = start_app(&pool, &mock).await;

    let (ada_h, ada_v) = register(&server, "ada").await;
    let (ben_h, ben_v) = register(&server, "ben").await;

    // Step 1: search the catalogue
    let results: Vec<BookMetadata> = server
        .get("/api/v1/search/books")
        .add_query_param("q", "dune")
        .add_header(ada_h.clone(), ada_v.clone())
        .await
        .json();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, "google_books");

    // Step 2: add it with autofill; missing fields come from the catalogue
    let response = server
        .post("/api/v1/books")
        .add_header(ada_h.clone(), ada_v.clone())
        .json(&json!({"title": "Dune", "isbn": "0441172717", "autofill": true, "status": "reading"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let dune: BookResponse = response.json();
    assert_eq!(dune.author, "Frank Herbert");
    assert_eq!(dune.isbn13.as_deref(), Some("9780441172719"));
    assert_eq!(dune.page_count, Some(535));
    assert_eq!(dune.status, BookStatus::Reading);
    assert!(dune.started_at.is_some());
    assert!(dune.cover_url.as_deref().is_some_and(|c| c.starts_with("https://") && !c.contains("edge=curl")));

    // Step 3: finishing it stamps the finish date
    let finished: BookResponse = server
        .patch(&format!("/api/v1/books/{}", dune.id))
        .add_header(ada_h.clone(), ada_v.clone())
        .json(&json!({"status": "read", "rating": 5}))
        .await
        .json();
    assert!(finished.finished_at.is_some());
    assert_eq!(finished.rating, Some(5));

    // Step 4: before following or sharing, ben cannot see the shelf
    let profile: ProfileResponse = server
        .get("/api/v1/users/ada")
        .add_header(ben_h.clone(), ben_v.clone())
        .await
        .json();
    assert!(!profile.can_view_shelf);
    server
        .get(&format!("/api/v1/books/{}/comments", dune.id))
        .add_header(ben_h.clone(), ben_v.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Step 5: ben follows ada and sees her activity
    server
        .post(&format!("/api/v1/users/{}/follow", profile.id))
        .add_header(ben_h.clone(), ben_v.clone())
        .await
        .assert_status_ok();
    let feed: Vec<FeedEntryResponse> = server.get("/api/v1/shelf/feed").add_header(ben_h.clone(), ben_v.clone()).await.json();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].book.id, dune.id);

    // Step 6: likes and comments
    let liked: LikeResponse = server
        .post(&format!("/api/v1/books/{}/like", dune.id))
        .add_header(ben_h.clone(), ben_v.clone())
        .await
        .json();
    assert_eq!(liked.like_count, 1);
    assert!(liked.liked);

    let comment: CommentResponse = server
        .post(&format!("/api/v1/books/{}/comments", dune.id))
        .add_header(ben_h.clone(), ben_v.clone())
        .json(&json!({"content": "The spice must flow"}))
        .await
        .json();
    assert_eq!(comment.author.username, "ben");

    // The book owner may delete comments on her book
    server
        .delete(&format!("/api/v1/books/{}/comments/{}", dune.id, comment.id))
        .add_header(ada_h.clone(), ada_v.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Step 7: share the shelf and read it anonymously
    let shared: ShareResponse = server.post("/api/v1/shelf/share").add_header(ada_h.clone(), ada_v.clone()).await.json();
    let slug = shared.share_slug.expect("slug");
    let public: PublicShelfResponse = server.get(&format!("/public/shelves/{slug}")).await.json();
    assert_eq!(public.owner.username, "ada");
    assert_eq!(public.books.len(), 1);
    assert_eq!(public.books[0].title, "Dune");

    bg_services.shutdown().await;
}

/// A club is formed, members suggest and vote, and the most popular book is picked.
#[sqlx::test]
#[test_log::test]
async fn test_e2e_book_club(pool: PgPool) {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "isbn:9780441172719"))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume_json()))
        .mount(&mock)
        .await;
    let (server, bg_services) = start_app(&pool, &mock).await;

    let (owner_h, owner_v) = register(&server, "host").await;
    let (cara_h, cara_v) = register(&server, "cara").await;
    let (dev_h, dev_v) = register(&server, "dev").await;

    let response = server
        .post("/api/v1/clubs")
        .add_header(owner_h.clone(), owner_v.clone())
        .json(&json!({"name": "Desert Readers", "description": "Long books, slowly"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let club: ClubResponse = response.json();

    server
        .post(&format!("/api/v1/clubs/{}/invites", club.id))
        .add_header(owner_h.clone(), owner_v.clone())
        .json(&json!({"email": "cara@example.com"}))
        .await
        .assert_status(StatusCode::CREATED);

    for (h, v) in [(cara_h.clone(), cara_v.clone()), (dev_h.clone(), dev_v.clone())] {
        server
            .post("/api/v1/clubs/join")
            .add_header(h, v)
            .json(&json!({"invite_code": club.invite_code}))
            .await
            .assert_status_ok();
    }

    // Catalogue lookup feeds the suggestion
    let found: BookMetadata = server
        .get("/api/v1/search/isbn/9780441172719")
        .add_header(cara_h.clone(), cara_v.clone())
        .await
        .json();
    let dune: SuggestionResponse = server
        .post(&format!("/api/v1/clubs/{}/suggestions", club.id))
        .add_header(cara_h.clone(), cara_v.clone())
        .json(&json!({
            "title": found.title,
            "author": found.authors.join(", "),
            "isbn": found.isbn13,
            "cover_url": found.cover_url,
        }))
        .await
        .json();
    let emma: SuggestionResponse = server
        .post(&format!("/api/v1/clubs/{}/suggestions", club.id))
        .add_header(dev_h.clone(), dev_v.clone())
        .json(&json!({"title": "Emma", "author": "Jane Austen"}))
        .await
        .json();

    for (h, v) in [(owner_h.clone(), owner_v.clone()), (dev_h.clone(), dev_v.clone())] {
        server
            .post(&format!("/api/v1/clubs/{}/suggestions/{}/vote", club.id, dune.id))
            .add_header(h, v)
            .await
            .assert_status_ok();
    }
    server
        .post(&format!("/api/v1/clubs/{}/suggestions/{}/vote", club.id, emma.id))
        .add_header(cara_h.clone(), cara_v.clone())
        .await
        .assert_status_ok();

    let ranked: Vec<SuggestionResponse> = server
        .get(&format!("/api/v1/clubs/{}/suggestions", club.id))
        .add_header(cara_h.clone(), cara_v.clone())
        .await
        .json();
    assert_eq!(ranked[0].id, dune.id);
    assert_eq!(ranked[0].vote_count, 2);

    let club: ClubResponse = server
        .post(&format!("/api/v1/clubs/{}/suggestions/{}/select", club.id, ranked[0].id))
        .add_header(owner_h, owner_v)
        .await
        .json();
    assert_eq!(club.member_count, 3);
    let current = club.current_book.expect("current book");
    assert_eq!(current.title, "Dune");
    assert_eq!(current.author.as_deref(), Some("Frank Herbert"));

    bg_services.shutdown().await;
}
