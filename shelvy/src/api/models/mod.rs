//! API request and response data models.
//!
//! These structures define the public JSON contract. They are kept apart from the database
//! models in [`crate::db::models`] so storage and API can evolve independently, and every type is
//! annotated with `utoipa` for the generated OpenAPI document.
//!
//! - [`auth`]: registration, login and password payloads
//! - [`users`]: accounts, public profiles and follows
//! - [`books`]: shelf entries, listing queries and manual ordering
//! - [`notes`], [`engagement`]: reading notes, likes and comments
//! - [`shelf`]: shelf settings, public sharing and the follow feed
//! - [`clubs`], [`suggestions`]: book clubs and what to read next
//! - [`search`]: metadata search parameters
//! - [`pagination`]: shared `skip`/`limit` handling

pub mod auth;
pub mod books;
pub mod clubs;
pub mod engagement;
pub mod notes;
pub mod pagination;
pub mod search;
pub mod shelf;
pub mod suggestions;
pub mod users;
