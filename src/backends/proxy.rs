//! Thin JSON proxies in front of the media database and the music catalog.
//!
//! Both proxies hold the API credentials server-side; the engine only sends
//! the query text and reads back an image URL plus an attribution link.

use anyhow::{bail, Result};
use log::debug;
use serde_json::Value;

use super::{non_empty_str, request_url, HttpClient, MediaDatabase, MediaKind, MusicCatalog};
use crate::models::ImageHit;

// ============================================================================
// Media database
// ============================================================================

pub struct MediaDbProxy {
    http: HttpClient,
    base_url: String,
}

impl MediaDbProxy {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    fn lookup_url(&self, query: &str, year: Option<i32>, kind: MediaKind) -> String {
        let year = year.map(|y| y.to_string());
        let mut params = vec![("query", query), ("type", kind.as_param())];
        if let Some(year) = year.as_deref() {
            params.push(("year", year));
        }
        request_url(&self.base_url, &params)
    }
}

/// `{imageUrl, sourceUrl}` on a hit; `{}`, `null` or an empty `imageUrl` on a miss.
pub fn parse_media_db(value: &Value) -> Result<Option<ImageHit>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(non_empty_str(value, "/imageUrl").map(|image_url| ImageHit {
            image_url,
            source_url: non_empty_str(value, "/sourceUrl"),
        })),
        other => bail!("Unexpected media database response: {other}"),
    }
}

impl MediaDatabase for MediaDbProxy {
    fn lookup(&self, query: &str, year: Option<i32>, kind: MediaKind) -> Result<Option<ImageHit>> {
        let url = self.lookup_url(query, year, kind);
        debug!("Media database lookup: {}", url);
        parse_media_db(&self.http.get_json(&url)?)
    }
}

// ============================================================================
// Music catalog
// ============================================================================

pub struct MusicCatalogProxy {
    http: HttpClient,
    base_url: String,
}

impl MusicCatalogProxy {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

/// Cover fields in order of preference: largest album art first.
const COVER_POINTERS: &[&str] = &[
    "/coverUrl",
    "/album/cover_xl",
    "/album/cover_big",
    "/album/cover",
];

fn track_cover(track: &Value) -> Option<ImageHit> {
    let image_url = COVER_POINTERS
        .iter()
        .find_map(|pointer| non_empty_str(track, pointer))?;
    Some(ImageHit {
        image_url,
        source_url: non_empty_str(track, "/link"),
    })
}

/// A single track object, or a search envelope `{data: [track, ...]}` whose
/// first track with a cover wins.
pub fn parse_music(value: &Value) -> Result<Option<ImageHit>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(tracks)) => Ok(tracks.iter().find_map(track_cover)),
            Some(Value::Null) | None => Ok(track_cover(value)),
            Some(other) => bail!("Unexpected music catalog data: {other}"),
        },
        other => bail!("Unexpected music catalog response: {other}"),
    }
}

impl MusicCatalog for MusicCatalogProxy {
    fn cover_art(&self, query: &str) -> Result<Option<ImageHit>> {
        let url = request_url(&self.base_url, &[("q", query)]);
        debug!("Music catalog lookup: {}", url);
        parse_music(&self.http.get_json(&url)?)
    }
}
