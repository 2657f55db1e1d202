//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Registration, login, logout, password changes
//! - **Users** (`/api/v1/users/*`): Profiles, reader search and follows
//! - **Books** (`/api/v1/books/*`): The caller's shelf, plus notes, likes and comments on books
//! - **Search** (`/api/v1/search/*`): Metadata provider search and ISBN lookup
//! - **Shelf** (`/api/v1/shelf/*`): Appearance settings, sharing and the activity feed
//! - **Clubs** (`/api/v1/clubs/*`): Book clubs, members, invites and reading suggestions
//! - **Public** (`/public/shelves/{slug}`): Shared shelves, no account needed
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The rendered reference is served at
//! `/docs` when the server is running.

pub mod handlers;
pub mod models;
