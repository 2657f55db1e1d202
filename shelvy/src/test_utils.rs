//! Test utilities shared by unit and integration tests.

use crate::AppState;
use crate::api::models::users::CurrentUser;
use crate::auth::session;
use crate::config::{Config, EmailConfig, EmailTransportConfig, PoolSettings};
use crate::db::handlers::{Books, Repository, Users};
use crate::db::models::books::{BookCreateDBRequest, BookDBResponse, BookStatus};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::metadata::MetadataService;
use axum_test::TestServer;
use sqlx::PgPool;
use std::sync::Arc;

/// Password every test user is created with.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Argon2 hash of [`TEST_PASSWORD`], computed once per test binary.
fn test_password_hash() -> String {
    static HASH: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    HASH.get_or_init(|| crate::auth::password::hash_string(TEST_PASSWORD).expect("hash test password"))
        .clone()
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("shelvy-test-emails-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_url: "http://localhost:5173".to_string(),
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        email: EmailConfig {
            transport: EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        enable_metrics: false,
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    // Tests never talk to real catalogues
    config.metadata.google_books.enabled = false;
    config.metadata.isbndb.enabled = false;
    config.metadata.open_library.enabled = false;
    config.backfill.enabled = false;
    config.auth.session.cookie_secure = false;
    config
}

/// App state with no metadata providers.
pub fn create_test_state(pool: PgPool) -> AppState {
    create_test_state_with_metadata(pool, MetadataService::new(vec![]))
}

pub fn create_test_state_with_metadata(pool: PgPool, metadata: MetadataService) -> AppState {
    AppState::builder()
        .db(pool)
        .config(create_test_config())
        .metadata(Arc::new(metadata))
        .build()
}

/// Full router over `state`, wrapped in a test server.
pub fn create_test_server(state: AppState) -> TestServer {
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub fn create_test_app(pool: PgPool) -> TestServer {
    create_test_server(create_test_state(pool))
}

/// Create a reader with the given username, `{username}@example.com` and [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &PgPool, username: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: None,
            password_hash: test_password_hash(),
        })
        .await
        .expect("Failed to create test user")
}

/// Add a want-to-read book by "Test Author" to a reader's shelf.
pub async fn create_test_book(pool: &PgPool, user_id: crate::types::UserId, title: &str) -> BookDBResponse {
    create_test_book_with_status(pool, user_id, title, BookStatus::WantToRead).await
}

pub async fn create_test_book_with_status(pool: &PgPool, user_id: crate::types::UserId, title: &str, status: BookStatus) -> BookDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Books::new(&mut conn)
        .create(&BookCreateDBRequest {
            user_id,
            title: title.to_string(),
            author: "Test Author".to_string(),
            isbn13: None,
            isbn10: None,
            google_books_id: None,
            cover_url: None,
            description: None,
            page_count: None,
            published_date: None,
            publisher: None,
            categories: vec![],
            status,
            rating: None,
            started_at: None,
            finished_at: None,
            metadata_attempted: false,
        })
        .await
        .expect("Failed to create test book")
}

/// `Authorization` header carrying a valid session token for `user`.
pub fn auth_header(user: &UserDBResponse) -> (axum::http::HeaderName, axum::http::HeaderValue) {
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    };
    let token = session::create_session_token(&current, &create_test_config()).expect("Failed to create session token");
    (
        axum::http::header::AUTHORIZATION,
        axum::http::HeaderValue::from_str(&format!("Bearer {token}")).expect("token is a valid header value"),
    )
}
