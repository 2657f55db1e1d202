//! Authentication.
//!
//! Readers sign in with email and password at `/authentication/login`. A successful login sets an
//! HTTP-only cookie holding a signed JWT ([`session`]); the same token is accepted as
//! `Authorization: Bearer <jwt>` for non-browser clients.
//!
//! There are no roles. Authorization is ownership-based and lives beside the data it protects:
//! a reader may modify their own books, notes and comments, and club actions are gated on the
//! caller's [`crate::db::models::clubs::ClubRole`].
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for the authenticated user (`CurrentUser` / `Option<CurrentUser>`)
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: JWT creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use shelvy::api::models::users::CurrentUser;
//!
//! async fn protected_handler(current_user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", current_user.username))
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod session;
