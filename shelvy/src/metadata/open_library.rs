//! Open Library client: search API plus the ISBN edition endpoint.

use super::{BookMetadata, MetadataProvider, ProviderError};
use crate::shelf::covers::open_library_cover_url;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchDoc {
    title: String,
    author_name: Vec<String>,
    isbn: Vec<String>,
    publisher: Vec<String>,
    first_publish_year: Option<i32>,
    number_of_pages_median: Option<i32>,
    subject: Vec<String>,
    cover_i: Option<i64>,
}

/// `description` is either a plain string or `{"type": "/type/text", "value": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextValue {
    Plain(String),
    Typed { value: String },
}

impl TextValue {
    fn into_string(self) -> String {
        match self {
            TextValue::Plain(s) | TextValue::Typed { value: s } => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Edition {
    title: String,
    subtitle: Option<String>,
    publishers: Vec<String>,
    publish_date: Option<String>,
    number_of_pages: Option<i32>,
    isbn_13: Vec<String>,
    isbn_10: Vec<String>,
    covers: Vec<i64>,
    subjects: Vec<String>,
    description: Option<TextValue>,
    by_statement: Option<String>,
}

pub struct OpenLibrary {
    client: Client,
    base_url: Url,
    covers_url: Url,
}

impl OpenLibrary {
    pub fn new(client: Client, base_url: Url, covers_url: Url) -> Self {
        Self {
            client,
            base_url,
            covers_url,
        }
    }

    fn cover_by_id(&self, cover_id: i64) -> String {
        format!("{}/b/id/{}-L.jpg", self.covers_url.as_str().trim_end_matches('/'), cover_id)
    }

    fn from_doc(&self, doc: SearchDoc) -> BookMetadata {
        let isbn13 = doc.isbn.iter().find(|i| i.len() == 13).cloned();
        let isbn10 = doc.isbn.iter().find(|i| i.len() == 10).cloned();
        BookMetadata {
            title: doc.title,
            authors: doc.author_name,
            isbn13,
            isbn10,
            google_books_id: None,
            cover_url: doc.cover_i.filter(|id| *id > 0).map(|id| self.cover_by_id(id)),
            description: None,
            page_count: doc.number_of_pages_median,
            published_date: doc.first_publish_year.map(|y| y.to_string()),
            publisher: doc.publisher.into_iter().next(),
            // Open Library subjects are noisy tags; keep a handful
            categories: doc.subject.into_iter().take(5).collect(),
            source: "open_library".to_string(),
        }
    }

    fn from_edition(&self, isbn: &str, edition: Edition) -> BookMetadata {
        let title = match edition.subtitle.as_deref().map(str::trim) {
            Some(subtitle) if !subtitle.is_empty() => format!("{}: {}", edition.title, subtitle),
            _ => edition.title,
        };
        // Edition records reference authors by key only; `by_statement` is the best inline hint
        let authors = edition
            .by_statement
            .map(|s| s.trim().trim_start_matches("by ").trim_end_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect();
        let cover_url = if edition.covers.iter().any(|id| *id > 0) {
            Some(open_library_cover_url(&self.covers_url, isbn))
        } else {
            None
        };

        BookMetadata {
            title,
            authors,
            isbn13: edition.isbn_13.into_iter().next(),
            isbn10: edition.isbn_10.into_iter().next(),
            google_books_id: None,
            cover_url,
            description: edition.description.map(TextValue::into_string),
            page_count: edition.number_of_pages,
            published_date: edition.publish_date,
            publisher: edition.publishers.into_iter().next(),
            categories: edition.subjects,
            source: "open_library".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for OpenLibrary {
    fn name(&self) -> &'static str {
        "open_library"
    }

    #[instrument(skip(self), err)]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookMetadata>, ProviderError> {
        let url = self.base_url.join("search.json").map_err(|e| ProviderError::Url(e.to_string()))?;
        let limit = limit.clamp(1, 100).to_string();
        let response = self.client.get(url).query(&[("q", query), ("limit", limit.as_str())]).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.docs.into_iter().map(|doc| self.from_doc(doc)).collect())
    }

    #[instrument(skip(self), err)]
    async fn lookup_isbn(&self, isbn: &str) -> Result<Option<BookMetadata>, ProviderError> {
        let url = self
            .base_url
            .join(&format!("isbn/{isbn}.json"))
            .map_err(|e| ProviderError::Url(e.to_string()))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let edition: Edition = response.json().await?;
                Ok(Some(self.from_edition(isbn, edition)))
            }
            s => Err(ProviderError::Status(s)),
        }
    }
}
