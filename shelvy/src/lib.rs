//! # shelvy: a social bookshelf service
//!
//! `shelvy` is the backend for a virtual bookshelf. Readers keep a shelf of books they want to
//! read, are reading and have read, decorate it, share it publicly through a link, follow other
//! readers, take notes, like and comment on each other's books, and run book clubs that vote on
//! what to read next.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! Requests to `/api/v1/*` carry either the session cookie set at login or an
//! `Authorization: Bearer <jwt>` header. The [`auth`] extractors turn either into a
//! [`api::models::users::CurrentUser`]; handlers then check ownership or club role before talking
//! to the database through the repositories in [`db::handlers`]. Public shelves at
//! `/public/shelves/{slug}` need no credentials.
//!
//! ### Core Components
//!
//! - **API layer** ([`api`]): route handlers and the JSON contract
//! - **Authentication** ([`auth`]): Argon2 password hashing and JWT sessions
//! - **Database layer** ([`db`]): repositories over PostgreSQL
//! - **Shelf utilities** ([`shelf`]): ISBN handling, shelf sorting, categories and covers
//! - **Metadata** ([`metadata`]): Google Books, ISBNdb and Open Library clients
//! - **Backfill** ([`backfill`]): background loop that enriches books missing metadata
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use shelvy::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = shelvy::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     shelvy::telemetry::init_telemetry(config.logging.format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod backfill;
pub mod config;
pub mod db;
mod email;
pub mod errors;
pub mod metadata;
mod openapi;
pub mod shelf;
pub mod telemetry;
mod types;

#[cfg(test)]
mod test;
#[cfg(test)]
pub mod test_utils;

use crate::backfill::BackfillService;
use crate::config::{CorsOrigin, DatabaseConfig};
use crate::metadata::MetadataService;
use crate::openapi::ApiDoc;
use axum::http::HeaderValue;
use axum::{
    Json, Router, http,
    routing::{get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{BookId, ClubId, CommentId, InviteId, NoteId, SuggestionId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .metadata(Arc::new(MetadataService::from_config(&config.metadata)?))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Enabled book metadata providers
    pub metadata: Arc<MetadataService>,
}

/// Get the shelvy database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL with the configured pool limits and run migrations.
async fn setup_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let settings = &config.pool;
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    // 0 disables the timeout
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    let pool = options.connect(&config.url).await?;
    migrator().run(&pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;
    // AllowOrigin::list rejects `*`, so a wildcard anywhere means any origin
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url::as_str keeps a trailing slash; browsers send origins without one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(cors_config.allow_credentials)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - Authentication routes at `/authentication/*`
/// - Reader API at `/api/v1/*`
/// - Public shelves at `/public/shelves/{slug}`
/// - OpenAPI document at `/api-docs/openapi.json`, rendered at `/docs`
/// - Optional Prometheus metrics at `/internal/metrics`
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, books, clubs, engagement, notes, public, search, shelf, suggestions, users};

    let auth_routes = Router::new()
        .route("/authentication/register", get(auth::get_registration_info).post(auth::register))
        .route("/authentication/login", post(auth::login))
        .route("/authentication/logout", post(auth::logout))
        .route("/authentication/password-change", post(auth::change_password))
        .with_state(state.clone());

    let api_routes = Router::new()
        // Readers and follows
        .route(
            "/users/me",
            get(users::get_me).patch(users::update_me).delete(users::delete_me),
        )
        .route("/users/me/followers", get(users::list_my_followers))
        .route("/users/me/following", get(users::list_my_following))
        .route("/users/search", get(users::search_users))
        .route("/users/{user}", get(users::get_profile))
        .route("/users/{user}/follow", post(users::follow_user).delete(users::unfollow_user))
        .route("/users/{user}/followers", get(users::list_followers))
        .route("/users/{user}/following", get(users::list_following))
        // Shelf entries
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/order", put(books::reorder_books))
        .route(
            "/books/{id}",
            get(books::get_book).patch(books::update_book).delete(books::delete_book),
        )
        .route("/books/{id}/enrich", post(books::enrich_book))
        // Notes, likes and comments on a book
        .route("/books/{id}/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/books/{id}/notes/{note_id}",
            axum::routing::patch(notes::update_note).delete(notes::delete_note),
        )
        .route("/books/{id}/like", post(engagement::like_book).delete(engagement::unlike_book))
        .route(
            "/books/{id}/comments",
            get(engagement::list_comments).post(engagement::create_comment),
        )
        .route("/books/{id}/comments/{comment_id}", axum::routing::delete(engagement::delete_comment))
        // Metadata search
        .route("/search/books", get(search::search_books))
        .route("/search/isbn/{isbn}", get(search::lookup_isbn))
        // Shelf settings, sharing and the follow feed
        .route("/shelf/settings", get(shelf::get_settings).put(shelf::update_settings))
        .route("/shelf/share", post(shelf::share_shelf).delete(shelf::unshare_shelf))
        .route("/shelf/feed", get(shelf::get_feed))
        // Book clubs
        .route("/clubs", get(clubs::list_clubs).post(clubs::create_club))
        .route("/clubs/join", post(clubs::join_club))
        .route(
            "/clubs/{id}",
            get(clubs::get_club).patch(clubs::update_club).delete(clubs::delete_club),
        )
        .route("/clubs/{id}/leave", post(clubs::leave_club))
        .route("/clubs/{id}/members", get(clubs::list_members))
        .route(
            "/clubs/{id}/members/{user_id}",
            axum::routing::patch(clubs::update_member_role).delete(clubs::remove_member),
        )
        .route("/clubs/{id}/invites", get(clubs::list_invites).post(clubs::create_invite))
        // Club suggestions
        .route(
            "/clubs/{id}/suggestions",
            get(suggestions::list_suggestions).post(suggestions::create_suggestion),
        )
        .route(
            "/clubs/{id}/suggestions/{suggestion_id}",
            axum::routing::delete(suggestions::delete_suggestion),
        )
        .route(
            "/clubs/{id}/suggestions/{suggestion_id}/vote",
            post(suggestions::vote).delete(suggestions::unvote),
        )
        .route(
            "/clubs/{id}/suggestions/{suggestion_id}/select",
            post(suggestions::select_suggestion),
        )
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/public/shelves/{slug}", get(public::get_public_shelf))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(auth_routes)
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background tasks and their lifecycle.
///
/// Currently this is only the metadata [`backfill`] loop. Dropping the struct cancels the
/// shutdown token through `drop_guard`; [`BackgroundServices::shutdown`] also waits for the
/// tasks to finish.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start background tasks according to configuration.
fn setup_background_services(
    pool: PgPool,
    metadata: Arc<MetadataService>,
    config: &Config,
    shutdown_token: CancellationToken,
) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    if config.backfill.enabled {
        let service = BackfillService::new(pool, metadata, config.backfill.clone());
        let token = shutdown_token.clone();
        background_tasks.push(tokio::spawn(service.run(token)));
    } else {
        info!("Metadata backfill disabled");
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and starts
///    background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown signal resolves, background services are stopped and the
///    pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting shelvy with configuration: {:#?}", config);

        let pool = setup_database(&config.database).await?;
        let metadata = Arc::new(MetadataService::from_config(&config.metadata)?);
        info!(providers = ?metadata.provider_names(), "Metadata providers configured");

        let shutdown_token = CancellationToken::new();
        let bg_services = setup_background_services(pool.clone(), metadata.clone(), &config, shutdown_token);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .metadata(metadata)
            .build();
        let router = build_router(app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Shelvy listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::metadata::MetadataService;
    use crate::test_utils::*;
    use sqlx::{ConnectOptions, PgPool};
    use std::sync::Arc;

    #[sqlx::test]
    async fn test_application_integration(pool: PgPool) {
        let mut config = create_test_config();
        config.database.url = pool.connect_options().to_url_lossy().to_string();

        let app = crate::Application::new(config).await;
        assert!(app.is_ok(), "Application::new should succeed");

        let (server, bg_services) = app.unwrap().into_test_server();

        let health_response = server.get("/healthz").await;
        assert_eq!(health_response.status_code().as_u16(), 200);
        assert_eq!(health_response.text(), "OK");

        let openapi_response = server.get("/api-docs/openapi.json").await;
        assert_eq!(openapi_response.status_code().as_u16(), 200);
        let doc: serde_json::Value = openapi_response.json();
        assert!(doc["paths"]["/api/v1/books"].is_object());

        // API routes require auth
        let api_response = server.get("/api/v1/books").await;
        assert_eq!(api_response.status_code().as_u16(), 401);

        bg_services.shutdown().await;
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = false;

        let state = AppState::builder()
            .db(pool)
            .config(config)
            .metadata(Arc::new(MetadataService::new(vec![])))
            .build();
        let router = super::build_router(state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let metrics_response = server.get("/internal/metrics").await;
        assert_eq!(metrics_response.status_code().as_u16(), 404);
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;

        let state = AppState::builder()
            .db(pool)
            .config(config)
            .metadata(Arc::new(MetadataService::new(vec![])))
            .build();
        let router = super::build_router(state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        // Generate at least one request so the request counters exist
        server.get("/healthz").await;

        let metrics_response = server.get("/internal/metrics").await;
        assert_eq!(metrics_response.status_code().as_u16(), 200);
        let metrics_content = metrics_response.text();
        assert!(metrics_content.contains("# HELP") || metrics_content.contains("# TYPE"));
    }

    #[sqlx::test]
    async fn test_cors_allows_configured_origin(pool: PgPool) {
        let server = create_test_app(pool);
        let response = server
            .get("/healthz")
            .add_header(axum::http::header::ORIGIN, axum::http::HeaderValue::from_static("http://localhost:5173"))
            .await;
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }

    #[sqlx::test]
    async fn test_cors_wildcard_without_credentials(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = false;
        config.auth.security.cors.allowed_origins = vec![crate::config::CorsOrigin::Wildcard];
        config.auth.security.cors.allow_credentials = false;
        config.validate().expect("wildcard without credentials is valid");

        let state = AppState::builder()
            .db(pool)
            .config(config)
            .metadata(Arc::new(MetadataService::new(vec![])))
            .build();
        let router = super::build_router(state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let response = server
            .get("/healthz")
            .add_header(axum::http::header::ORIGIN, axum::http::HeaderValue::from_static("https://anywhere.example"))
            .await;
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
    }
}
