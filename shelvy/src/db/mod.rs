//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (api::handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries and parameter binding)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded with `sqlx::migrate!`. The
//! [`crate::migrator`] function exposes them and [`crate::Application::new`] runs them at startup:
//!
//! ```ignore
//! shelvy::migrator().run(&pool).await?;
//! ```
//!
//! Ownership and visibility rules (who may see a shelf, who may moderate a club) are enforced in
//! the API handlers, not by row-level policies in Postgres.

pub mod errors;
pub mod handlers;
pub mod models;
