//! Core data models for image resolution.
//!
//! This module contains the query/result types exchanged with callers,
//! the closed classification enums the router matches on, and batch
//! statistics used by the CLI tools.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Classification
// ============================================================================

/// Language of a query string or of an encyclopedia edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Nl,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Nl => "nl",
            Language::En => "en",
        }
    }
}

/// Coarse subject classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectType {
    Person,
    #[serde(alias = "movie")]
    Film,
    #[serde(alias = "tv", alias = "tv-show")]
    TvSeries,
    Product,
    Logo,
    #[serde(alias = "event")]
    NewsEvent,
    Location,
    Artwork,
    #[serde(alias = "tradition")]
    Culture,
    #[serde(other)]
    Unclassified,
}

/// Coarser topical category attached by the upstream generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Music,
    Politics,
    Sports,
    Local,
    Culture,
    Lifestyle,
    Entertainment,
    International,
    #[serde(other)]
    Other,
}

// ============================================================================
// Sources
// ============================================================================

/// Every backend strategy the router can put on a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Media-commons file search (language neutral, English-leaning).
    Commons,
    /// Encyclopedia in the local language.
    LocalWikipedia,
    /// Encyclopedia in the international language.
    InternationalWikipedia,
    /// Commons search qualified with the national archive's name.
    NationalArchive,
    MediaDbPerson,
    MediaDbMovie,
    MediaDbTv,
    MusicCatalog,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Commons => "commons",
            Source::LocalWikipedia => "local-wikipedia",
            Source::InternationalWikipedia => "international-wikipedia",
            Source::NationalArchive => "national-archive",
            Source::MediaDbPerson => "media-db-person",
            Source::MediaDbMovie => "media-db-movie",
            Source::MediaDbTv => "media-db-tv",
            Source::MusicCatalog => "music-catalog",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Query
// ============================================================================

/// One resolution request. `id` correlates the request with its result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub id: String,
    /// Query in the local language.
    pub query: String,
    /// Optional query in the international language.
    #[serde(default)]
    pub query_en: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub subject_type: Option<SubjectType>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_celebrity: bool,
    #[serde(default)]
    pub is_movie: bool,
    #[serde(default)]
    pub is_tv: bool,
    #[serde(default)]
    pub is_music: bool,
    /// "artist - title" query for the music catalog.
    #[serde(default)]
    pub music_query: Option<String>,
}

impl SearchQuery {
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_subject(mut self, subject: SubjectType) -> Self {
        self.subject_type = Some(subject);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_query_en(mut self, query_en: impl Into<String>) -> Self {
        self.query_en = Some(query_en.into());
        self
    }

    pub fn with_music_query(mut self, music_query: impl Into<String>) -> Self {
        self.is_music = true;
        self.music_query = Some(music_query.into());
        self
    }

    /// International query text, falling back to the local one.
    pub fn international_text(&self) -> &str {
        self.query_en
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(&self.query)
    }
}

// ============================================================================
// Results
// ============================================================================

/// An accepted image with its attribution page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageHit {
    pub image_url: String,
    pub source_url: Option<String>,
}

/// Outcome of one strategy call as recorded in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceOutcome {
    Found,
    NotFound,
    Error,
}

/// Diagnostic record of one strategy call. Has no effect on resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTraceEntry {
    pub source: Source,
    pub query: String,
    /// Whether the step passed the query's year to the strategy. A strategy
    /// may still have matched in one of its yearless phases.
    pub with_year: bool,
    pub outcome: TraceOutcome,
}

/// Final answer for one query. `image_url == None` means nothing acceptable was found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub id: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub trace: Vec<SearchTraceEntry>,
}

impl ImageResult {
    pub fn is_found(&self) -> bool {
        self.image_url.is_some()
    }

    /// Source of the entry that produced the image, if any.
    pub fn winning_source(&self) -> Option<Source> {
        self.trace
            .iter()
            .find(|entry| entry.outcome == TraceOutcome::Found)
            .map(|entry| entry.source)
    }
}

// ============================================================================
// Rejection Set
// ============================================================================

/// Image URLs that must never be returned. A read-only snapshot per batch.
#[derive(Clone, Debug, Default)]
pub struct RejectionSet {
    urls: FxHashSet<String>,
}

impl RejectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RejectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Batch statistics for the CLI tools.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ResolveStats {
    pub total_queries: usize,
    pub found: usize,
    pub not_found: usize,

    // Which source produced each image
    pub wins_by_source: BTreeMap<String, usize>,

    // Trace outcomes across all strategy calls
    pub trace_found: usize,
    pub trace_not_found: usize,
    pub trace_errors: usize,

    pub elapsed_seconds: f64,
}

impl ResolveStats {
    pub fn record(&mut self, result: &ImageResult) {
        self.total_queries += 1;
        match result.winning_source() {
            Some(source) if result.is_found() => {
                self.found += 1;
                *self.wins_by_source.entry(source.name().to_string()).or_default() += 1;
            }
            _ => self.not_found += 1,
        }
        for entry in &result.trace {
            match entry.outcome {
                TraceOutcome::Found => self.trace_found += 1,
                TraceOutcome::NotFound => self.trace_not_found += 1,
                TraceOutcome::Error => self.trace_errors += 1,
            }
        }
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            100.0 * self.found as f64 / self.total_queries as f64
        }
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            log::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
