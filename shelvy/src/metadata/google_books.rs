//! Google Books volumes API client.

use super::{BookMetadata, MetadataProvider, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

/// Google Books caps `maxResults` at 40.
const MAX_RESULTS: usize = 40;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<i32>,
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl From<Volume> for BookMetadata {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let identifier = |kind: &str| {
            info.industry_identifiers
                .iter()
                .find(|i| i.kind == kind)
                .map(|i| i.identifier.clone())
        };
        let isbn13 = identifier("ISBN_13");
        let isbn10 = identifier("ISBN_10");
        let title = match info.subtitle.as_deref().map(str::trim) {
            Some(subtitle) if !subtitle.is_empty() && !info.title.is_empty() => format!("{}: {}", info.title, subtitle),
            _ => info.title,
        };
        let cover_url = info.image_links.and_then(|links| links.thumbnail.or(links.small_thumbnail));

        BookMetadata {
            title,
            authors: info.authors,
            isbn13,
            isbn10,
            google_books_id: Some(volume.id),
            cover_url,
            description: info.description,
            page_count: info.page_count,
            published_date: info.published_date,
            publisher: info.publisher,
            categories: info.categories,
            source: "google_books".to_string(),
        }
    }
}

pub struct GoogleBooks {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl GoogleBooks {
    pub fn new(client: Client, base_url: Url, api_key: Option<String>) -> Self {
        Self { client, base_url, api_key }
    }

    async fn volumes(&self, q: &str, limit: usize) -> Result<Vec<BookMetadata>, ProviderError> {
        let url = self.base_url.join("volumes").map_err(|e| ProviderError::Url(e.to_string()))?;
        let max_results = limit.clamp(1, MAX_RESULTS).to_string();

        let mut request = self.client.get(url).query(&[("q", q), ("maxResults", max_results.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }
        let body: VolumesResponse = response.json().await?;
        Ok(body.items.into_iter().map(BookMetadata::from).collect())
    }
}

#[async_trait::async_trait]
impl MetadataProvider for GoogleBooks {
    fn name(&self) -> &'static str {
        "google_books"
    }

    #[instrument(skip(self), err)]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookMetadata>, ProviderError> {
        self.volumes(query, limit).await
    }

    #[instrument(skip(self), err)]
    async fn lookup_isbn(&self, isbn: &str) -> Result<Option<BookMetadata>, ProviderError> {
        let mut results = self.volumes(&format!("isbn:{isbn}"), 1).await?;
        Ok(if results.is_empty() { None } else { Some(results.swap_remove(0)) })
    }
}
