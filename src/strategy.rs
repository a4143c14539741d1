//! Per-source search strategies.
//!
//! Encyclopedia-style sources run a phased fallback driven by a policy table
//! ([`Phase`]); the media database and music catalog answer in a single call.
//! Every strategy applies the file-type filter and the rejection set before
//! accepting an image.

use anyhow::Result;
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;

use crate::backends::{
    Encyclopedia, HttpClient, MediaDatabase, MediaDbProxy, MediaKind, MediaWiki, MusicCatalog,
    MusicCatalogProxy, SearchHit, WikiFlavor,
};
use crate::config::EngineConfig;
use crate::matching::content_matches;
use crate::models::{ImageHit, Language, RejectionSet, Source};
use crate::normalize::{clean_media_db_query, normalize_query};
use crate::safety::{has_blocked_title_extension, is_allowed_url};

// ============================================================================
// Phase policy
// ============================================================================

/// One row of the phased-fallback policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Search for the exact phrase.
    pub quoted: bool,
    /// Append the year, when the request has one.
    pub with_year: bool,
    /// Strict content matching (still subject to the request's own strictness).
    pub strict: bool,
}

/// Exact phrase with year, then loose with year, then loose without year and lenient.
pub const DEFAULT_PHASES: [Phase; 3] = [
    Phase {
        quoted: true,
        with_year: true,
        strict: true,
    },
    Phase {
        quoted: false,
        with_year: true,
        strict: true,
    },
    Phase {
        quoted: false,
        with_year: false,
        strict: false,
    },
];

/// Expand the policy table into concrete `(search text, strict)` attempts.
///
/// Without a year, year-constrained phases run unconstrained; attempts that
/// repeat an earlier one are dropped.
pub fn phase_ladder(
    phases: &[Phase],
    query: &str,
    year: Option<i32>,
    strict: bool,
) -> Vec<(String, bool)> {
    let mut ladder: Vec<(String, bool)> = Vec::with_capacity(phases.len());
    for phase in phases {
        let mut text = if phase.quoted {
            format!("\"{}\"", query)
        } else {
            query.to_string()
        };
        if phase.with_year {
            if let Some(year) = year {
                text.push_str(&format!(" {}", year));
            }
        }
        let attempt = (text, phase.strict && strict);
        if !ladder.contains(&attempt) {
            ladder.push(attempt);
        }
    }
    ladder
}

// ============================================================================
// Strategy interface
// ============================================================================

/// Backend answers seen while resolving one query.
///
/// A ladder often visits the same source twice (with and without year), and
/// the yearless pass would otherwise repeat searches the first pass already
/// made. Attempts already made are skipped; searches and media lookups are
/// answered from memory. Failed calls are not remembered.
#[derive(Debug, Default)]
pub struct SearchCache {
    attempts: RefCell<FxHashSet<(Source, String, bool, bool)>>,
    searches: RefCell<FxHashMap<(Source, String), Vec<SearchHit>>>,
    media: RefCell<FxHashMap<(Source, String), Option<ImageHit>>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt; false if the same source already ran it with the
    /// same strictness and vector allowance.
    pub fn first_attempt(
        &self,
        source: Source,
        text: &str,
        strict: bool,
        allow_vector: bool,
    ) -> bool {
        self.attempts
            .borrow_mut()
            .insert((source, text.to_string(), strict, allow_vector))
    }

    fn search(
        &self,
        source: Source,
        backend: &dyn Encyclopedia,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let key = (source, text.to_string());
        if let Some(hits) = self.searches.borrow().get(&key) {
            return Ok(hits.clone());
        }
        let hits = backend.search(text, limit)?;
        self.searches.borrow_mut().insert(key, hits.clone());
        Ok(hits)
    }

    fn media(
        &self,
        source: Source,
        backend: &dyn Encyclopedia,
        title: &str,
    ) -> Result<Option<ImageHit>> {
        let key = (source, title.to_string());
        if let Some(hit) = self.media.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let hit = backend.media(title)?;
        self.media.borrow_mut().insert(key, hit.clone());
        Ok(hit)
    }
}

/// Parameters of one strategy call, as decided by the router.
#[derive(Debug, Clone, Copy)]
pub struct StrategyRequest<'a> {
    pub query: &'a str,
    /// Language of `query`; picks the normalizer's vocabulary.
    pub language: Language,
    pub year: Option<i32>,
    pub allow_vector: bool,
    pub strict: bool,
    /// Shared by every strategy call of one resolution.
    pub cache: &'a SearchCache,
}

pub trait ImageStrategy: Send + Sync {
    fn source(&self) -> Source;

    /// Query text as it will be sent to the backend (recorded in the trace).
    fn effective_query(&self, request: &StrategyRequest) -> String {
        request.query.to_string()
    }

    /// Search for an acceptable image.
    ///
    /// `Ok(None)` is a clean miss. `Err` means nothing was found and at least
    /// one backend call failed along the way.
    fn search(
        &self,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>>;
}

fn accept(hit: &ImageHit, allow_vector: bool, rejected: &RejectionSet) -> bool {
    if !is_allowed_url(&hit.image_url, allow_vector) {
        debug!("Disallowed file type: {}", hit.image_url);
        return false;
    }
    if rejected.contains(&hit.image_url) {
        debug!("Rejected image skipped: {}", hit.image_url);
        return false;
    }
    true
}

// ============================================================================
// Encyclopedia / media commons
// ============================================================================

/// Phased text search plus media resolution against a MediaWiki-style backend.
///
/// The national-archive flavor is the same search over the media commons with
/// a fixed institutional qualifier appended to every search text.
pub struct EncyclopediaStrategy {
    source: Source,
    backend: Arc<dyn Encyclopedia>,
    phases: Vec<Phase>,
    result_limit: usize,
    qualifier: Option<String>,
}

impl EncyclopediaStrategy {
    pub fn new(
        source: Source,
        backend: Arc<dyn Encyclopedia>,
        phases: &[Phase],
        result_limit: usize,
    ) -> Self {
        Self {
            source,
            backend,
            phases: phases.to_vec(),
            result_limit,
            qualifier: None,
        }
    }

    pub fn with_qualifier(mut self, qualifier: &str) -> Self {
        self.qualifier = Some(qualifier.to_string());
        self
    }

    fn qualify(&self, text: &str) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{} {}", text, qualifier),
            None => text.to_string(),
        }
    }

    /// One phase: walk the result window until a candidate survives every filter.
    fn search_phase(
        &self,
        text: &str,
        validate_against: &str,
        strict: bool,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>> {
        let allow_vector = request.allow_vector;
        let candidates = request
            .cache
            .search(self.source, self.backend.as_ref(), text, self.result_limit)?;
        debug!("[{}] '{}': {} candidates", self.source, text, candidates.len());

        let mut media_error = None;
        for candidate in candidates.iter().take(self.result_limit) {
            if has_blocked_title_extension(&candidate.title, allow_vector) {
                continue;
            }
            if !content_matches(&candidate.title, &candidate.snippet, validate_against, strict) {
                debug!("[{}] No content match: {}", self.source, candidate.title);
                continue;
            }
            let lookup = request
                .cache
                .media(self.source, self.backend.as_ref(), &candidate.title);
            let hit = match lookup {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "[{}] Media lookup failed for '{}': {:#}",
                        self.source, candidate.title, e
                    );
                    media_error = Some(e);
                    continue;
                }
            };
            if accept(&hit, allow_vector, rejected) {
                return Ok(Some(hit));
            }
        }

        match media_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

impl ImageStrategy for EncyclopediaStrategy {
    fn source(&self) -> Source {
        self.source
    }

    fn effective_query(&self, request: &StrategyRequest) -> String {
        self.qualify(&normalize_query(request.query, request.language))
    }

    fn search(
        &self,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>> {
        let normalized = normalize_query(request.query, request.language);
        let ladder = phase_ladder(&self.phases, &normalized, request.year, request.strict);

        let mut last_error = None;
        for (text, strict) in ladder {
            let text = self.qualify(&text);
            if !request
                .cache
                .first_attempt(self.source, &text, strict, request.allow_vector)
            {
                debug!("[{}] Already tried '{}' (strict: {})", self.source, text, strict);
                continue;
            }
            match self.search_phase(&text, &normalized, strict, request, rejected) {
                Ok(Some(hit)) => {
                    info!("[{}] Found image for '{}'", self.source, text);
                    return Ok(Some(hit));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("[{}] Phase '{}' failed: {:#}", self.source, text, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Media database
// ============================================================================

/// Single lookup in one asset pool of the media database. No relaxation.
pub struct MediaDbStrategy {
    kind: MediaKind,
    backend: Arc<dyn MediaDatabase>,
}

impl MediaDbStrategy {
    pub fn new(kind: MediaKind, backend: Arc<dyn MediaDatabase>) -> Self {
        Self { kind, backend }
    }
}

impl ImageStrategy for MediaDbStrategy {
    fn source(&self) -> Source {
        match self.kind {
            MediaKind::Person => Source::MediaDbPerson,
            MediaKind::Movie => Source::MediaDbMovie,
            MediaKind::Tv => Source::MediaDbTv,
        }
    }

    fn effective_query(&self, request: &StrategyRequest) -> String {
        clean_media_db_query(request.query)
    }

    fn search(
        &self,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>> {
        let cleaned = clean_media_db_query(request.query);
        let hit = self.backend.lookup(&cleaned, request.year, self.kind)?;
        Ok(hit.filter(|hit| accept(hit, request.allow_vector, rejected)))
    }
}

// ============================================================================
// Music catalog
// ============================================================================

pub struct MusicStrategy {
    backend: Arc<dyn MusicCatalog>,
}

impl MusicStrategy {
    pub fn new(backend: Arc<dyn MusicCatalog>) -> Self {
        Self { backend }
    }
}

impl ImageStrategy for MusicStrategy {
    fn source(&self) -> Source {
        Source::MusicCatalog
    }

    fn search(
        &self,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>> {
        let hit = self.backend.cover_art(request.query.trim())?;
        Ok(hit.filter(|hit| accept(hit, request.allow_vector, rejected)))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Strategies available to the router, one per source.
#[derive(Default, Clone)]
pub struct Sources {
    strategies: FxHashMap<Source, Arc<dyn ImageStrategy>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under its own source, replacing any previous one.
    pub fn insert(&mut self, strategy: Arc<dyn ImageStrategy>) {
        self.strategies.insert(strategy.source(), strategy);
    }

    pub fn get(&self, source: Source) -> Option<&Arc<dyn ImageStrategy>> {
        self.strategies.get(&source)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Build the HTTP-backed strategies described by the configuration.
    /// Proxies without a configured URL are left out.
    pub fn from_config(config: &EngineConfig) -> Self {
        let http = HttpClient::new(&config.user_agent);
        let wiki = |url: &str, flavor: WikiFlavor| -> Arc<dyn Encyclopedia> {
            Arc::new(MediaWiki::new(http.clone(), url, flavor, config.thumb_width))
        };

        let commons = wiki(&config.commons_api_url, WikiFlavor::Commons);
        let local = wiki(&config.local_wikipedia_api_url, WikiFlavor::Wikipedia);
        let international = wiki(&config.international_wikipedia_api_url, WikiFlavor::Wikipedia);

        let mut sources = Self::new();
        let limit = config.result_limit;
        let phases = &config.phases;
        sources.insert(Arc::new(EncyclopediaStrategy::new(
            Source::Commons,
            commons.clone(),
            phases,
            limit,
        )));
        sources.insert(Arc::new(
            EncyclopediaStrategy::new(Source::NationalArchive, commons, phases, limit)
                .with_qualifier(&config.archive_qualifier),
        ));
        sources.insert(Arc::new(EncyclopediaStrategy::new(
            Source::LocalWikipedia,
            local,
            phases,
            limit,
        )));
        sources.insert(Arc::new(EncyclopediaStrategy::new(
            Source::InternationalWikipedia,
            international,
            phases,
            limit,
        )));

        match &config.media_db_url {
            Some(url) => {
                let db: Arc<dyn MediaDatabase> = Arc::new(MediaDbProxy::new(http.clone(), url));
                for kind in [MediaKind::Person, MediaKind::Movie, MediaKind::Tv] {
                    sources.insert(Arc::new(MediaDbStrategy::new(kind, db.clone())));
                }
            }
            None => debug!("No media database URL configured, skipping media-db sources"),
        }

        match &config.music_catalog_url {
            Some(url) => {
                let catalog: Arc<dyn MusicCatalog> = Arc::new(MusicCatalogProxy::new(http, url));
                sources.insert(Arc::new(MusicStrategy::new(catalog)));
            }
            None => debug!("No music catalog URL configured, skipping music-catalog source"),
        }

        sources
    }
}
