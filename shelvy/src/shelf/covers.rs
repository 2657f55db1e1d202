//! Cover image URL clean-up.

use url::Url;

fn is_google_books_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h.starts_with("books.google.") || h.ends_with("books.googleusercontent.com"))
}

/// Normalise a cover URL coming from a provider or a user.
///
/// - blank input gives `None`
/// - protocol-relative `//host/...` and `http://` are upgraded to `https://`
/// - Google Books thumbnails lose the page-curl effect (`edge=curl`) and are pinned to `zoom=1`
pub fn normalize_cover_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upgraded = if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("https://{rest}")
    } else {
        trimmed.to_string()
    };

    let mut url = Url::parse(&upgraded).ok()?;
    if url.scheme() != "https" {
        return None;
    }

    if is_google_books_host(&url) {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, v)| !(k == "edge" && v == "curl") && k != "zoom")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("zoom", "1");
    }

    Some(url.to_string())
}

/// Large cover from the Open Library covers service.
pub fn open_library_cover_url(covers_base: &Url, isbn: &str) -> String {
    format!("{}/b/isbn/{}-L.jpg", covers_base.as_str().trim_end_matches('/'), isbn)
}

/// First candidate that survives normalisation.
pub fn best_cover<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates.into_iter().flatten().find_map(normalize_cover_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_thumbnail_cleanup() {
        let raw = "http://books.google.com/books/content?id=abc&printsec=frontcover&img=1&zoom=5&edge=curl&source=gbs_api";
        assert_eq!(
            normalize_cover_url(raw).as_deref(),
            Some("https://books.google.com/books/content?id=abc&printsec=frontcover&img=1&source=gbs_api&zoom=1")
        );
    }

    #[test]
    fn test_protocol_relative_and_blank() {
        assert_eq!(
            normalize_cover_url("//covers.openlibrary.org/b/id/1-L.jpg").as_deref(),
            Some("https://covers.openlibrary.org/b/id/1-L.jpg")
        );
        assert_eq!(normalize_cover_url("   "), None);
        assert_eq!(normalize_cover_url("not a url"), None);
        assert_eq!(normalize_cover_url("ftp://example.com/cover.jpg"), None);
    }

    #[test]
    fn test_non_google_query_untouched() {
        assert_eq!(
            normalize_cover_url("https://images.isbndb.com/covers/61/57/9780306406157.jpg?edge=curl").as_deref(),
            Some("https://images.isbndb.com/covers/61/57/9780306406157.jpg?edge=curl")
        );
    }

    #[test]
    fn test_open_library_cover() {
        let base = Url::parse("https://covers.openlibrary.org/").unwrap();
        assert_eq!(
            open_library_cover_url(&base, "9780306406157"),
            "https://covers.openlibrary.org/b/isbn/9780306406157-L.jpg"
        );
    }

    #[test]
    fn test_best_cover_skips_blanks() {
        assert_eq!(
            best_cover([None, Some(""), Some("http://example.com/a.jpg")]).as_deref(),
            Some("https://example.com/a.jpg")
        );
    }
}
