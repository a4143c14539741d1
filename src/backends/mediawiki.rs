//! MediaWiki API client for the media commons and the encyclopedia editions.

use anyhow::{bail, Result};
use log::debug;
use serde_json::Value;

use super::{non_empty_str, request_url, Encyclopedia, HttpClient, SearchHit};
use crate::models::ImageHit;

/// File namespace: media commons searches only look at files.
const FILE_NAMESPACE: &str = "6";
/// Article namespace
const ARTICLE_NAMESPACE: &str = "0";

/// Which kind of wiki the API belongs to; decides namespace and media lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiFlavor {
    /// Every page is a file; media comes from `imageinfo`.
    Commons,
    /// Articles; media comes from the lead image (`pageimages`).
    Wikipedia,
}

pub struct MediaWiki {
    http: HttpClient,
    api_url: String,
    flavor: WikiFlavor,
    thumb_width: u32,
}

impl MediaWiki {
    pub fn new(http: HttpClient, api_url: &str, flavor: WikiFlavor, thumb_width: u32) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            flavor,
            thumb_width,
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> String {
        let namespace = match self.flavor {
            WikiFlavor::Commons => FILE_NAMESPACE,
            WikiFlavor::Wikipedia => ARTICLE_NAMESPACE,
        };
        let limit = limit.to_string();
        request_url(
            &self.api_url,
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("srnamespace", namespace),
                ("format", "json"),
                ("formatversion", "2"),
                ("utf8", "1"),
            ],
        )
    }

    fn media_url(&self, title: &str) -> String {
        let width = self.thumb_width.to_string();
        match self.flavor {
            WikiFlavor::Commons => request_url(
                &self.api_url,
                &[
                    ("action", "query"),
                    ("titles", title),
                    ("prop", "imageinfo"),
                    ("iiprop", "url"),
                    ("iiurlwidth", &width),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            ),
            WikiFlavor::Wikipedia => request_url(
                &self.api_url,
                &[
                    ("action", "query"),
                    ("titles", title),
                    ("prop", "pageimages|info"),
                    ("piprop", "thumbnail|original"),
                    ("pithumbsize", &width),
                    ("inprop", "url"),
                    ("redirects", "1"),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            ),
        }
    }
}

/// Parse `query.search[]` into hits. A response without that array is malformed.
pub fn parse_search(value: &Value) -> Result<Vec<SearchHit>> {
    let Some(results) = value.pointer("/query/search").and_then(Value::as_array) else {
        if let Some(info) = non_empty_str(value, "/error/info") {
            bail!("Search API error: {info}");
        }
        bail!("Search response missing query.search");
    };

    Ok(results
        .iter()
        .filter_map(|item| {
            let title = non_empty_str(item, "/title")?;
            let snippet = item["snippet"].as_str().unwrap_or_default().to_string();
            Some(SearchHit { title, snippet })
        })
        .collect())
}

/// Parse a page query into an image. Missing pages and pages without media are `None`.
pub fn parse_media(value: &Value, flavor: WikiFlavor) -> Result<Option<ImageHit>> {
    let Some(pages) = value.pointer("/query/pages").and_then(Value::as_array) else {
        bail!("Media response missing query.pages");
    };
    let Some(page) = pages.first() else {
        return Ok(None);
    };
    if page["missing"].as_bool().unwrap_or(false) || page["invalid"].as_bool().unwrap_or(false) {
        return Ok(None);
    }

    let hit = match flavor {
        WikiFlavor::Commons => {
            let image_url = non_empty_str(page, "/imageinfo/0/thumburl")
                .or_else(|| non_empty_str(page, "/imageinfo/0/url"));
            image_url.map(|image_url| ImageHit {
                image_url,
                source_url: non_empty_str(page, "/imageinfo/0/descriptionurl"),
            })
        }
        WikiFlavor::Wikipedia => {
            let image_url = non_empty_str(page, "/thumbnail/source")
                .or_else(|| non_empty_str(page, "/original/source"));
            image_url.map(|image_url| ImageHit {
                image_url,
                source_url: non_empty_str(page, "/fullurl"),
            })
        }
    };
    Ok(hit)
}

impl Encyclopedia for MediaWiki {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = self.search_url(query, limit);
        debug!("MediaWiki search: {}", url);
        let parsed = self.http.get_json(&url)?;
        let mut hits = parse_search(&parsed)?;
        hits.truncate(limit);
        Ok(hits)
    }

    fn media(&self, title: &str) -> Result<Option<ImageHit>> {
        let parsed = self.http.get_json(&self.media_url(title))?;
        parse_media(&parsed, self.flavor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search() {
        let value = json!({
            "query": {"search": [
                {"title": "File:Zeelandbrug 1965.jpg", "snippet": "Opening <span class=\"searchmatch\">Zeelandbrug</span>"},
                {"title": "  ", "snippet": "ignored"},
                {"title": "File:Brug.jpg"}
            ]}
        });
        let hits = parse_search(&value).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "File:Zeelandbrug 1965.jpg");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_parse_search_malformed() {
        assert!(parse_search(&json!({"batchcomplete": true})).is_err());
        let err = parse_search(&json!({"error": {"info": "maxlag"}})).unwrap_err();
        assert!(err.to_string().contains("maxlag"));
        assert!(parse_search(&Value::Null).is_err());
    }

    #[test]
    fn test_parse_commons_media_prefers_thumb() {
        let value = json!({"query": {"pages": [{
            "title": "File:Zeelandbrug 1965.jpg",
            "imageinfo": [{
                "thumburl": "https://upload.wikimedia.org/thumb/z/800px-Zeelandbrug_1965.jpg",
                "url": "https://upload.wikimedia.org/z/Zeelandbrug_1965.jpg",
                "descriptionurl": "https://commons.wikimedia.org/wiki/File:Zeelandbrug_1965.jpg"
            }]
        }]}});
        let hit = parse_media(&value, WikiFlavor::Commons).unwrap().unwrap();
        assert!(hit.image_url.contains("800px"));
        assert_eq!(
            hit.source_url.as_deref(),
            Some("https://commons.wikimedia.org/wiki/File:Zeelandbrug_1965.jpg")
        );
    }

    #[test]
    fn test_parse_wikipedia_media() {
        let value = json!({"query": {"pages": [{
            "title": "Dallas (televisieserie)",
            "original": {"source": "https://upload.wikimedia.org/Dallas_logo.png"},
            "fullurl": "https://nl.wikipedia.org/wiki/Dallas_(televisieserie)"
        }]}});
        let hit = parse_media(&value, WikiFlavor::Wikipedia).unwrap().unwrap();
        assert_eq!(hit.image_url, "https://upload.wikimedia.org/Dallas_logo.png");
        assert!(hit.source_url.unwrap().ends_with("Dallas_(televisieserie)"));
    }

    #[test]
    fn test_parse_media_missing_page() {
        let value = json!({"query": {"pages": [{"title": "Nope", "missing": true}]}});
        assert_eq!(parse_media(&value, WikiFlavor::Wikipedia).unwrap(), None);
        let value = json!({"query": {"pages": [{"title": "No image"}]}});
        assert_eq!(parse_media(&value, WikiFlavor::Commons).unwrap(), None);
        assert!(parse_media(&json!({}), WikiFlavor::Commons).is_err());
    }
}
