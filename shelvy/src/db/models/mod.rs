//! Database record structures matching the table schemas.
//!
//! Each submodule holds the `*CreateDBRequest` / `*UpdateDBRequest` inputs and `*DBResponse` rows
//! for one table (or a table plus the joins it is always read with). API-facing shapes live in
//! [`crate::api::models`].

pub mod books;
pub mod clubs;
pub mod engagement;
pub mod follows;
pub mod notes;
pub mod shelf_settings;
pub mod suggestions;
pub mod users;
