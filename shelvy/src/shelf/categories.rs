//! Genre normalisation and priority ordering for the category shelf sort.

/// Well-known genres, in shelf order.
pub const CATEGORY_PRIORITY: &[&str] = &[
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Thriller",
    "Horror",
    "Romance",
    "Historical Fiction",
    "Literary Fiction",
    "Young Adult",
    "Children",
    "Graphic Novels",
    "Poetry",
    "Fiction",
    "Biography",
    "Memoir",
    "History",
    "Science",
    "Philosophy",
    "Psychology",
    "Religion",
    "Self-Help",
    "Business",
    "Politics",
    "Travel",
    "Cooking",
    "Art",
    "Nonfiction",
];

/// Provider spellings that mean one of the known genres.
const ALIASES: &[(&str, &str)] = &[
    ("sci-fi", "Science Fiction"),
    ("science fiction", "Science Fiction"),
    ("detective and mystery stories", "Mystery"),
    ("mystery & detective", "Mystery"),
    ("suspense", "Thriller"),
    ("thrillers", "Thriller"),
    ("love stories", "Romance"),
    ("historical", "Historical Fiction"),
    ("literary", "Literary Fiction"),
    ("young adult fiction", "Young Adult"),
    ("juvenile fiction", "Children"),
    ("juvenile nonfiction", "Children"),
    ("comics & graphic novels", "Graphic Novels"),
    ("biography & autobiography", "Biography"),
    ("autobiography", "Memoir"),
    ("self-help", "Self-Help"),
    ("self help", "Self-Help"),
    ("business & economics", "Business"),
    ("political science", "Politics"),
    ("body, mind & spirit", "Religion"),
    ("cooking", "Cooking"),
    ("non-fiction", "Nonfiction"),
];

fn canonical(segment: &str) -> Option<&'static str> {
    let needle = segment.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    CATEGORY_PRIORITY
        .iter()
        .copied()
        .find(|known| known.to_lowercase() == needle)
        .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == needle).map(|(_, known)| *known))
}

/// Map a raw provider category to a known genre.
///
/// Google Books returns hierarchical strings such as `"Fiction / Fantasy / Epic"`; the most
/// specific segment that is a known genre wins (`Fantasy` here).
pub fn normalize_category(raw: &str) -> Option<&'static str> {
    raw.split('/').rev().find_map(canonical)
}

/// The category a book is shelved under: the first raw category that maps to a known genre, else
/// the first raw category as given.
pub fn primary_category(categories: &[String]) -> Option<String> {
    categories
        .iter()
        .find_map(|c| normalize_category(c))
        .map(str::to_string)
        .or_else(|| {
            categories
                .iter()
                .map(|c| c.trim())
                .find(|c| !c.is_empty())
                .map(str::to_string)
        })
}

/// Position in [`CATEGORY_PRIORITY`]. Unknown categories rank after every known one, and books with
/// no category at all rank last.
pub fn category_rank(category: Option<&str>) -> usize {
    match category {
        Some(c) => normalize_category(c)
            .and_then(|known| CATEGORY_PRIORITY.iter().position(|p| *p == known))
            .unwrap_or(CATEGORY_PRIORITY.len()),
        None => CATEGORY_PRIORITY.len() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_hierarchy_picks_most_specific_known() {
        assert_eq!(normalize_category("Fiction / Fantasy / Epic"), Some("Fantasy"));
        assert_eq!(normalize_category("Fiction / General"), Some("Fiction"));
        assert_eq!(normalize_category("Juvenile Fiction"), Some("Children"));
        assert_eq!(normalize_category("Knitting"), None);
    }

    #[test]
    fn test_primary_category_falls_back_to_raw() {
        let cats = vec!["Knitting".to_string(), "Fiction / Mystery & Detective / General".to_string()];
        assert_eq!(primary_category(&cats).as_deref(), Some("Mystery"));

        let cats = vec!["  ".to_string(), "Knitting".to_string()];
        assert_eq!(primary_category(&cats).as_deref(), Some("Knitting"));

        assert_eq!(primary_category(&[]), None);
    }

    #[test]
    fn test_known_before_unknown_before_none() {
        let fantasy = category_rank(Some("Fantasy"));
        let nonfiction = category_rank(Some("Nonfiction"));
        let unknown = category_rank(Some("Knitting"));
        let none = category_rank(None);

        assert!(fantasy < nonfiction);
        assert!(nonfiction < unknown);
        assert!(unknown < none);
    }
}
