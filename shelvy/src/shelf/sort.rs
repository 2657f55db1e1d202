//! Shelf ordering, including the deterministic "random" arrangement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

use super::categories::{category_rank, primary_category};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "shelf_sort", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Manual,
    Title,
    Author,
    Recent,
    Category,
    Random,
}

/// Linear congruential generator: `seed = (seed * 9301 + 49297) % 233280`.
///
/// Web clients run the same generator, so a stored seed lays the shelf out identically everywhere.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

const LCG_MUL: u64 = 9301;
const LCG_INC: u64 = 49297;
const LCG_MOD: u64 = 233280;

impl SeededRng {
    pub fn new(seed: i64) -> Self {
        Self {
            state: seed.rem_euclid(LCG_MOD as i64) as u64,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MUL + LCG_INC) % LCG_MOD;
        self.state as f64 / LCG_MOD as f64
    }
}

/// Fisher–Yates shuffle driven by [`SeededRng`].
pub fn seeded_shuffle<T>(items: &mut [T], seed: i64) {
    let mut rng = SeededRng::new(seed);
    for i in (1..items.len()).rev() {
        let j = ((rng.next_f64() * (i + 1) as f64) as usize).min(i);
        items.swap(i, j);
    }
}

/// What the sorter needs to know about a book on a shelf.
pub trait ShelfItem {
    fn title(&self) -> &str;
    fn author(&self) -> &str;
    fn categories(&self) -> &[String];
    fn position(&self) -> i32;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Lower-cased title with a leading English article dropped.
pub fn title_sort_key(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    for article in ["the ", "a ", "an "] {
        if let Some(rest) = lower.strip_prefix(article) {
            return rest.trim_start().to_string();
        }
    }
    lower
}

fn by_title<T: ShelfItem>(a: &T, b: &T) -> Ordering {
    title_sort_key(a.title()).cmp(&title_sort_key(b.title()))
}

/// Sort a shelf in place.
pub fn sort_books<T: ShelfItem>(books: &mut [T], order: SortOrder, seed: i64) {
    match order {
        SortOrder::Manual => books.sort_by(|a, b| a.position().cmp(&b.position()).then(a.created_at().cmp(&b.created_at()))),
        SortOrder::Title => books.sort_by(by_title),
        SortOrder::Author => books.sort_by(|a, b| {
            a.author()
                .trim()
                .to_lowercase()
                .cmp(&b.author().trim().to_lowercase())
                .then_with(|| by_title(a, b))
        }),
        SortOrder::Recent => books.sort_by(|a, b| b.updated_at().cmp(&a.updated_at())),
        SortOrder::Category => books.sort_by_cached_key(|book| {
            let primary = primary_category(book.categories());
            (
                category_rank(primary.as_deref()),
                primary.map(|c| c.to_lowercase()).unwrap_or_default(),
                title_sort_key(book.title()),
            )
        }),
        SortOrder::Random => {
            // Shuffle from a fixed starting order so the result doesn't depend on fetch order
            books.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then_with(|| by_title(a, b)));
            seeded_shuffle(books, seed);
        }
    }
}
