//! Backend clients for the external repositories.
//!
//! Each repository sits behind a small trait so strategies can be exercised
//! against in-memory fakes. The HTTP implementations use a blocking `ureq`
//! agent; timeouts are left at the client defaults.

pub mod mediawiki;
pub mod proxy;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::ImageHit;

pub use mediawiki::{MediaWiki, WikiFlavor};
pub use proxy::{MediaDbProxy, MusicCatalogProxy};

/// One text-search result: page title plus highlighted snippet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

/// Encyclopedia or media-commons style repository.
pub trait Encyclopedia: Send + Sync {
    /// Ordered text-search results, at most `limit`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Media URL and attribution page for a page title, if the page has an image.
    fn media(&self, title: &str) -> Result<Option<ImageHit>>;
}

/// Asset pool of the structured media database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Person,
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_param(self) -> &'static str {
        match self {
            MediaKind::Person => "person",
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

/// Structured media database (portraits, posters, series artwork).
pub trait MediaDatabase: Send + Sync {
    fn lookup(&self, query: &str, year: Option<i32>, kind: MediaKind) -> Result<Option<ImageHit>>;
}

/// Music catalog returning cover art for an "artist - title" query.
pub trait MusicCatalog: Send + Sync {
    fn cover_art(&self, query: &str) -> Result<Option<ImageHit>>;
}

// ============================================================================
// HTTP
// ============================================================================

/// Shared blocking HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::AgentBuilder::new().user_agent(user_agent).build();
        Self { agent }
    }

    /// GET a JSON document. A 404 is reported as `Value::Null`.
    pub fn get_json(&self, url: &str) -> Result<Value> {
        let response = match self.agent.get(url).set("Accept", "application/json").call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(Value::Null),
            Err(error) => return Err(error).with_context(|| format!("Request failed: {url}")),
        };
        response
            .into_json::<Value>()
            .with_context(|| format!("Invalid JSON response from {url}"))
    }
}

/// Append url-encoded query parameters to a base URL.
pub fn request_url(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = base.to_string();
    if params.is_empty() {
        return url;
    }

    url.push(if base.contains('?') { '&' } else { '?' });
    for (index, (key, value)) in params.iter().enumerate() {
        if index > 0 {
            url.push('&');
        }
        url.push_str(key);
        url.push('=');
        url.push_str(urlencoding::encode(value).as_ref());
    }
    url
}

/// Trimmed, non-empty string at a JSON pointer.
pub(crate) fn non_empty_str(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
