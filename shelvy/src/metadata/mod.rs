//! Book metadata from external catalogues.
//!
//! Three providers are supported, consulted in a fixed order:
//!
//! 1. [`google_books::GoogleBooks`] - broad coverage, good covers and categories
//! 2. [`isbndb::Isbndb`] - paid, strong on ISBN lookups
//! 3. [`open_library::OpenLibrary`] - free fallback
//!
//! [`MetadataService`] wraps the enabled providers. Free-text search returns the first provider
//! that produces results; ISBN lookups merge every provider's answer field by field, earlier
//! providers winning. Results are normalised (both ISBN forms, https cover URLs, trimmed
//! categories) before leaving the service. Provider failures are logged and skipped; only when
//! every provider fails does the caller see [`Error::Upstream`].

pub mod google_books;
pub mod isbndb;
pub mod open_library;

use crate::config::MetadataConfig;
use crate::db::models::books::{BookDBResponse, BookMetadataFill};
use crate::errors::Error;
use crate::shelf::{covers::normalize_cover_url, isbn::Isbn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// Everything a provider may know about a book. All fields except `title` and `source` may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
    pub google_books_id: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub page_count: Option<i32>,
    pub published_date: Option<String>,
    pub publisher: Option<String>,
    pub categories: Vec<String>,
    /// Provider that produced the record
    pub source: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl BookMetadata {
    /// Authors joined for display, `""` when unknown.
    pub fn author(&self) -> String {
        self.authors.join(", ")
    }

    /// Derive both ISBN forms, force https covers and drop blank or duplicate values.
    pub fn normalized(mut self) -> Self {
        let parsed = self
            .isbn13
            .as_deref()
            .and_then(Isbn::parse)
            .or_else(|| self.isbn10.as_deref().and_then(Isbn::parse));
        match parsed {
            Some(isbn) => {
                self.isbn13 = isbn.isbn13;
                self.isbn10 = isbn.isbn10;
            }
            None => {
                self.isbn13 = None;
                self.isbn10 = None;
            }
        }

        self.title = self.title.trim().to_string();
        self.cover_url = self.cover_url.as_deref().and_then(normalize_cover_url);
        self.description = non_blank(self.description);
        self.published_date = non_blank(self.published_date);
        self.publisher = non_blank(self.publisher);
        self.page_count = self.page_count.filter(|p| *p > 0);

        let mut categories: Vec<String> = Vec::with_capacity(self.categories.len());
        for category in self.categories.drain(..) {
            let category = category.trim().to_string();
            if !category.is_empty() && !categories.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
                categories.push(category);
            }
        }
        self.categories = categories;
        self.authors.retain(|a| !a.trim().is_empty());
        self
    }

    /// Fill fields that are still empty from `other`.
    pub fn merge(&mut self, other: BookMetadata) {
        if self.title.is_empty() {
            self.title = other.title;
        }
        if self.authors.is_empty() {
            self.authors = other.authors;
        }
        if self.categories.is_empty() {
            self.categories = other.categories;
        }
        self.isbn13 = self.isbn13.take().or(other.isbn13);
        self.isbn10 = self.isbn10.take().or(other.isbn10);
        self.google_books_id = self.google_books_id.take().or(other.google_books_id);
        self.cover_url = self.cover_url.take().or(other.cover_url);
        self.description = self.description.take().or(other.description);
        self.page_count = self.page_count.or(other.page_count);
        self.published_date = self.published_date.take().or(other.published_date);
        self.publisher = self.publisher.take().or(other.publisher);
        if self.source.is_empty() {
            self.source = other.source;
        }
    }

    /// The columns this record can fill on a stored book.
    pub fn to_fill(&self) -> BookMetadataFill {
        BookMetadataFill {
            isbn13: self.isbn13.clone(),
            isbn10: self.isbn10.clone(),
            google_books_id: self.google_books_id.clone(),
            cover_url: self.cover_url.clone(),
            description: self.description.clone(),
            page_count: self.page_count,
            published_date: self.published_date.clone(),
            publisher: self.publisher.clone(),
            categories: self.categories.clone(),
        }
    }
}

/// Failure talking to one provider
#[derive(ThisError, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid request URL: {0}")]
    Url(String),
}

/// A book catalogue that can be searched by free text and looked up by ISBN.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw (un-normalised) matches for a free-text query, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookMetadata>, ProviderError>;

    /// Exact lookup; `Ok(None)` when the catalogue does not know the ISBN.
    async fn lookup_isbn(&self, isbn: &str) -> Result<Option<BookMetadata>, ProviderError>;
}

/// Ordered set of enabled providers.
#[derive(Clone)]
pub struct MetadataService {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService").field("providers", &self.provider_names()).finish()
    }
}

impl MetadataService {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self { providers }
    }

    /// Build the enabled providers sharing one HTTP client.
    pub fn from_config(config: &MetadataConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shelvy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();
        if config.google_books.enabled {
            providers.push(Arc::new(google_books::GoogleBooks::new(
                client.clone(),
                config.google_books.base_url.clone(),
                config.google_books.api_key.clone(),
            )));
        }
        if config.isbndb.enabled {
            let api_key = config
                .isbndb
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("metadata.isbndb.api_key is required when ISBNdb is enabled"))?;
            providers.push(Arc::new(isbndb::Isbndb::new(client.clone(), config.isbndb.base_url.clone(), api_key)));
        }
        if config.open_library.enabled {
            providers.push(Arc::new(open_library::OpenLibrary::new(
                client,
                config.open_library.base_url.clone(),
                config.open_library.covers_url.clone(),
            )));
        }
        Ok(Self::new(providers))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn upstream_error(&self, failures: Vec<(&'static str, ProviderError)>) -> Error {
        let provider = failures.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");
        let message = failures.iter().map(|(name, e)| format!("{name}: {e}")).collect::<Vec<_>>().join("; ");
        Error::Upstream { provider, message }
    }

    /// First provider with a non-empty answer wins.
    #[instrument(skip(self), err)]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookMetadata>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::BadRequest {
                message: "Search query must not be empty".to_string(),
            });
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.search(query, limit).await {
                Ok(results) if !results.is_empty() => {
                    debug!(provider = provider.name(), count = results.len(), "Search results found");
                    return Ok(results
                        .into_iter()
                        .map(BookMetadata::normalized)
                        .filter(|m| !m.title.is_empty())
                        .take(limit)
                        .collect());
                }
                Ok(_) => debug!(provider = provider.name(), "No search results, trying next provider"),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Metadata search failed, trying next provider");
                    failures.push((provider.name(), e));
                }
            }
        }

        if !self.providers.is_empty() && failures.len() == self.providers.len() {
            return Err(self.upstream_error(failures));
        }
        Ok(Vec::new())
    }

    /// Ask every provider and merge the answers, earlier providers taking precedence.
    #[instrument(skip(self), err)]
    pub async fn lookup_isbn(&self, raw_isbn: &str) -> Result<Option<BookMetadata>, Error> {
        let isbn = Isbn::parse(raw_isbn).ok_or_else(|| Error::BadRequest {
            message: format!("'{raw_isbn}' is not a valid ISBN"),
        })?;
        let key = isbn.preferred().unwrap_or(raw_isbn).to_string();

        let mut merged: Option<BookMetadata> = None;
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.lookup_isbn(&key).await {
                Ok(Some(found)) => {
                    debug!(provider = provider.name(), "ISBN found");
                    match merged.as_mut() {
                        Some(m) => m.merge(found),
                        None => merged = Some(found),
                    }
                }
                Ok(None) => debug!(provider = provider.name(), "ISBN unknown to provider"),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "ISBN lookup failed");
                    failures.push((provider.name(), e));
                }
            }
        }

        match merged {
            Some(mut metadata) => {
                // The ISBN asked for is authoritative
                metadata.isbn13 = isbn.isbn13.clone().or(metadata.isbn13);
                metadata.isbn10 = isbn.isbn10.clone().or(metadata.isbn10);
                Ok(Some(metadata.normalized()))
            }
            None if !self.providers.is_empty() && failures.len() == self.providers.len() => Err(self.upstream_error(failures)),
            None => Ok(None),
        }
    }

    /// Best metadata for a stored book: by ISBN when it has one, otherwise a "title author"
    /// search preferring an exact title match.
    #[instrument(skip(self, book), fields(book_id = %crate::types::abbrev_uuid(&book.id)), err)]
    pub async fn find_for_book(&self, book: &BookDBResponse) -> Result<Option<BookMetadata>, Error> {
        if let Some(isbn) = book.isbn13.as_deref().or(book.isbn10.as_deref())
            && Isbn::parse(isbn).is_some()
        {
            return self.lookup_isbn(isbn).await;
        }

        self.find_by_title(&book.title, &book.author).await
    }

    /// Search for "title author", preferring an exact title match over the top hit.
    pub async fn find_by_title(&self, title: &str, author: &str) -> Result<Option<BookMetadata>, Error> {
        let query = format!("{title} {author}");
        let results = self.search(query.trim(), 5).await?;
        Ok(pick_match(title, results))
    }
}

/// Prefer a result whose title matches exactly (ignoring case), else the top hit.
fn pick_match(title: &str, mut results: Vec<BookMetadata>) -> Option<BookMetadata> {
    let wanted = title.trim().to_lowercase();
    match results.iter().position(|m| m.title.to_lowercase() == wanted) {
        Some(idx) => Some(results.swap_remove(idx)),
        None => results.into_iter().next(),
    }
}
