//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed `PgConnection` (a pooled connection or an open transaction),
//! binds parameters for its queries and returns models from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`Users`]: reader accounts, lookup by email/username, user search
//! - [`Books`]: shelf contents, manual ordering, the follow feed, metadata backfill
//! - [`ShelfSettings`]: per-reader shelf appearance and public sharing
//! - [`Follows`]: the follow graph and profile counts
//! - [`Clubs`]: clubs, memberships, the current book and invites
//! - [`Suggestions`]: club reading suggestions and votes
//! - [`Notes`]: reading notes
//! - [`Engagement`]: likes and comments
//!
//! # Usage
//!
//! ```ignore
//! use shelvy::db::handlers::{Repository, Users};
//!
//! let mut tx = pool.begin().await?;
//! let user = Users::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```
//!
//! Writes that touch several rows (club creation, registration plus shelf defaults) go through a
//! transaction; single reads may use a plain pooled connection.

pub mod books;
pub mod clubs;
pub mod engagement;
pub mod follows;
pub mod notes;
pub mod repository;
pub mod shelf_settings;
pub mod suggestions;
pub mod users;

pub use books::Books;
pub use clubs::Clubs;
pub use engagement::Engagement;
pub use follows::Follows;
pub use notes::Notes;
pub use repository::Repository;
pub use shelf_settings::ShelfSettings;
pub use suggestions::Suggestions;
pub use users::Users;
