//! Open Library API client
//!
//! Resolves an ISBN to a title and author list. The edition record at
//! `/isbn/<isbn>.json` usually references authors by key only, so each
//! author record is fetched in turn.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("bookz/", env!("CARGO_PKG_VERSION"), " (personal reading log)");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Open Library client errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Catalog returned HTTP {0}")]
    ApiError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Title and author(s) found for an ISBN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub title: String,
    /// Author names joined with ", "
    pub author: String,
}

#[derive(Debug, Deserialize)]
struct EditionRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    key: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorRecord {
    name: Option<String>,
}

/// Open Library API client
#[derive(Clone)]
pub struct OpenLibraryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up a normalized ISBN
    ///
    /// `Ok(None)` when the catalog has no such edition.
    pub async fn lookup_isbn(&self, isbn: &str) -> Result<Option<BookDetails>, LookupError> {
        let url = format!("{}/isbn/{}.json", self.base_url, isbn);
        tracing::debug!(isbn = %isbn, url = %url, "Querying Open Library");

        let Some(edition) = self.get_json::<EditionRecord>(&url).await? else {
            tracing::debug!(isbn = %isbn, "ISBN not in catalog");
            return Ok(None);
        };

        let mut names = Vec::with_capacity(edition.authors.len());
        for author in &edition.authors {
            if let Some(name) = author.name.as_deref().filter(|n| !n.trim().is_empty()) {
                names.push(name.trim().to_string());
                continue;
            }
            let Some(key) = author.key.as_deref() else {
                continue;
            };
            match self.author_name(key).await {
                Ok(Some(name)) => names.push(name),
                Ok(None) => tracing::debug!(author_key = %key, "Author record has no name"),
                Err(e) => tracing::warn!(author_key = %key, "Author lookup failed: {}", e),
            }
        }

        Ok(Some(BookDetails {
            title: edition.title.trim().to_string(),
            author: names.join(", "),
        }))
    }

    async fn author_name(&self, key: &str) -> Result<Option<String>, LookupError> {
        let url = format!("{}{}.json", self.base_url, key);
        let record = self.get_json::<AuthorRecord>(&url).await?;

        Ok(record
            .and_then(|r| r.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()))
    }

    /// GET and decode; 404 becomes `Ok(None)`
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>, LookupError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::ApiError(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| LookupError::ParseError(e.to_string()))
    }
}
