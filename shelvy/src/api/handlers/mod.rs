//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Visibility and ownership checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, logout and password changes
//! - [`books`]: The reader's own shelf: book CRUD, ordering and metadata enrichment
//! - [`clubs`]: Book clubs, memberships, roles and email invites
//! - [`engagement`]: Likes and comments on other readers' books
//! - [`notes`]: Reading notes attached to books
//! - [`public`]: Unauthenticated views of shared shelves
//! - [`search`]: Metadata provider search and ISBN lookup
//! - [`shelf`]: Shelf settings, sharing and the activity feed
//! - [`suggestions`]: Club reading suggestions and votes
//! - [`users`]: Profiles, reader search and follows
//!
//! # Authentication
//!
//! Most handlers take a [`crate::api::models::users::CurrentUser`] argument, which is
//! extracted from the session cookie or a bearer token.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to an HTTP status code and a JSON
//! error body.

pub mod auth;
pub mod books;
pub mod clubs;
pub mod engagement;
pub mod notes;
pub mod public;
pub mod search;
pub mod shelf;
pub mod suggestions;
pub mod users;
