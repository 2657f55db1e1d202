//! Common type definitions shared across the API and database layers.
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: Reader account identifier
//! - [`BookId`]: A book on a reader's shelf
//! - [`ClubId`]: Book club identifier
//! - [`SuggestionId`]: A club reading suggestion
//! - [`NoteId`] / [`CommentId`]: Book notes and comments
//!
//! # Authorization vocabulary
//!
//! [`Operation`] and [`Resource`] describe a denied action in
//! [`crate::errors::Error::InsufficientPermissions`]. Ownership rules themselves live in the
//! handlers; there is no role table for readers.

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type BookId = Uuid;
pub type ClubId = Uuid;
pub type SuggestionId = Uuid;
pub type NoteId = Uuid;
pub type CommentId = Uuid;
pub type InviteId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Operations that can be denied. *-Own means restricted to the caller's own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadOwn,
    ReadAll,
    CreateOwn,
    UpdateOwn,
    UpdateAll,
    DeleteOwn,
    DeleteAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Books,
    Notes,
    Comments,
    Shelves,
    Clubs,
    ClubMembers,
    Suggestions,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateOwn => write!(f, "create"),
            Operation::ReadOwn | Operation::ReadAll => write!(f, "read"),
            Operation::UpdateOwn | Operation::UpdateAll => write!(f, "update"),
            Operation::DeleteOwn | Operation::DeleteAll => write!(f, "delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Books => "books",
            Resource::Notes => "notes",
            Resource::Comments => "comments",
            Resource::Shelves => "shelves",
            Resource::Clubs => "clubs",
            Resource::ClubMembers => "club members",
            Resource::Suggestions => "suggestions",
        };
        f.write_str(name)
    }
}
