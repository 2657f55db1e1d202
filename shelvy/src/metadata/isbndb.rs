//! ISBNdb API client. Requires an API key sent in the `Authorization` header.

use super::{BookMetadata, MetadataProvider, ProviderError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

#[derive(Debug, Deserialize)]
struct BooksResponse {
    #[serde(default)]
    books: Vec<IsbndbBook>,
}

#[derive(Debug, Deserialize)]
struct BookResponse {
    book: IsbndbBook,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IsbndbBook {
    title: String,
    title_long: Option<String>,
    isbn: Option<String>,
    isbn13: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    date_published: Option<String>,
    synopsis: Option<String>,
    overview: Option<String>,
    pages: Option<i32>,
    subjects: Vec<String>,
    image: Option<String>,
}

impl From<IsbndbBook> for BookMetadata {
    fn from(book: IsbndbBook) -> Self {
        let title = if book.title.trim().is_empty() {
            book.title_long.unwrap_or_default()
        } else {
            book.title
        };
        BookMetadata {
            title,
            authors: book.authors,
            isbn13: book.isbn13,
            isbn10: book.isbn,
            google_books_id: None,
            cover_url: book.image,
            description: book.synopsis.or(book.overview),
            page_count: book.pages,
            published_date: book.date_published,
            publisher: book.publisher,
            categories: book.subjects,
            source: "isbndb".to_string(),
        }
    }
}

pub struct Isbndb {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl Isbndb {
    pub fn new(client: Client, base_url: Url, api_key: String) -> Self {
        Self { client, base_url, api_key }
    }

    /// `{base}/{collection}/{value}` with `value` percent-encoded as one path segment.
    fn url(&self, collection: &str, value: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .push(collection)
            .push(value);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for Isbndb {
    fn name(&self) -> &'static str {
        "isbndb"
    }

    #[instrument(skip(self), err)]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookMetadata>, ProviderError> {
        let url = self.url("books", query)?;
        let page_size = limit.clamp(1, 1000).to_string();
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("page", "1"), ("pageSize", page_size.as_str())])
            .send()
            .await?;

        match response.status() {
            // ISBNdb answers 404 for a search with no matches
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => {
                let body: BooksResponse = response.json().await?;
                Ok(body.books.into_iter().map(BookMetadata::from).collect())
            }
            s => Err(ProviderError::Status(s)),
        }
    }

    #[instrument(skip(self), err)]
    async fn lookup_isbn(&self, isbn: &str) -> Result<Option<BookMetadata>, ProviderError> {
        let url = self.url("book", isbn)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body: BookResponse = response.json().await?;
                Ok(Some(body.book.into()))
            }
            s => Err(ProviderError::Status(s)),
        }
    }
}
