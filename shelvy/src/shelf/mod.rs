//! Pure shelf utilities: ISBN handling, shelf ordering, genre ranking and cover clean-up.
//!
//! Nothing in here touches the database or the network, so these functions back both the API
//! handlers and the metadata backfill.

pub mod categories;
pub mod covers;
pub mod isbn;
pub mod sort;

use rand::prelude::RngExt;
use rand::rng;

const SLUG_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const INVITE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rng();
    (0..len).map(|_| charset[rng.random_range(0..charset.len())] as char).collect()
}

/// Slug for a public shelf link: 10 lower-case alphanumerics.
pub fn share_slug() -> String {
    random_string(SLUG_CHARSET, 10)
}

/// Club invite code: 8 upper-case alphanumerics.
pub fn invite_code() -> String {
    random_string(INVITE_CHARSET, 8)
}
