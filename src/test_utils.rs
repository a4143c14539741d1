//! Test utilities for the image resolver.
//!
//! In-memory stand-ins for the backends and strategies, with call counters
//! and a concurrency high-water mark. Only compiled when running tests.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::backends::{Encyclopedia, MediaDatabase, MediaKind, SearchHit};
use crate::models::{ImageHit, RejectionSet, Source};
use crate::strategy::{ImageStrategy, StrategyRequest};

/// Tracks how many calls are in flight at once.
#[derive(Default)]
pub struct ConcurrencyGauge {
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Hold a slot for `delay`, recording the peak.
    pub fn hold(&self, delay: Duration) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

/// Encyclopedia fake: a search returns every page whose title contains one of
/// the query words (quotes ignored, case-insensitive).
#[derive(Default)]
pub struct FakeEncyclopedia {
    pages: Vec<(String, String)>,
    fail: bool,
    delay: Duration,
    searched: Mutex<Vec<String>>,
    media_calls: AtomicUsize,
    pub gauge: ConcurrencyGauge,
}

impl FakeEncyclopedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, title: &str, image_url: &str) -> Self {
        self.pages.push((title.to_string(), image_url.to_string()));
        self
    }

    /// Every call fails like a transport error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.searched.lock().unwrap().len()
    }

    pub fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }
}

impl Encyclopedia for FakeEncyclopedia {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.searched.lock().unwrap().push(query.to_string());
        self.gauge.hold(self.delay);
        if self.fail {
            bail!("connection refused");
        }

        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.trim_matches('"').to_lowercase())
            .filter(|w| w.len() > 2)
            .collect();
        Ok(self
            .pages
            .iter()
            .filter(|(title, _)| {
                let title = title.to_lowercase();
                words.iter().any(|w| title.contains(w.as_str()))
            })
            .take(limit)
            .map(|(title, _)| SearchHit {
                title: title.clone(),
                snippet: String::new(),
            })
            .collect())
    }

    fn media(&self, title: &str) -> Result<Option<ImageHit>> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("connection refused");
        }
        Ok(self
            .pages
            .iter()
            .find(|(page, _)| page == title)
            .map(|(page, url)| ImageHit {
                image_url: url.clone(),
                source_url: Some(format!("https://wiki.example/{}", page.replace(' ', "_"))),
            }))
    }
}

/// Media database fake with one optional answer per asset pool.
#[derive(Default)]
pub struct FakeMediaDb {
    hits: Vec<(MediaKind, String)>,
    calls: Mutex<Vec<MediaKind>>,
}

impl FakeMediaDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hit(mut self, kind: MediaKind, image_url: &str) -> Self {
        self.hits.push((kind, image_url.to_string()));
        self
    }

    pub fn calls(&self, kind: MediaKind) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

impl MediaDatabase for FakeMediaDb {
    fn lookup(
        &self,
        _query: &str,
        _year: Option<i32>,
        kind: MediaKind,
    ) -> Result<Option<ImageHit>> {
        self.calls.lock().unwrap().push(kind);
        Ok(self
            .hits
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, url)| ImageHit {
                image_url: url.clone(),
                source_url: None,
            }))
    }
}

/// What a [`MockStrategy`] was asked.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub query: String,
    pub year: Option<i32>,
    pub allow_vector: bool,
    pub strict: bool,
}

/// Canned strategy answering every request the same way.
pub struct MockStrategy {
    source: Source,
    hit: Option<ImageHit>,
    fail: bool,
    vector_only: bool,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockStrategy {
    /// Finds nothing.
    pub fn miss(source: Source) -> Self {
        Self {
            source,
            hit: None,
            fail: false,
            vector_only: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn hit(source: Source, image_url: &str) -> Self {
        Self {
            hit: Some(ImageHit {
                image_url: image_url.to_string(),
                source_url: Some(format!("https://{}.example/page", source)),
            }),
            ..Self::miss(source)
        }
    }

    pub fn failing(source: Source) -> Self {
        Self {
            fail: true,
            ..Self::miss(source)
        }
    }

    /// Answer with the hit only when vector art is allowed.
    pub fn vector_only(mut self) -> Self {
        self.vector_only = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ImageStrategy for MockStrategy {
    fn source(&self) -> Source {
        self.source
    }

    fn search(
        &self,
        request: &StrategyRequest,
        rejected: &RejectionSet,
    ) -> Result<Option<ImageHit>> {
        self.requests.lock().unwrap().push(RecordedRequest {
            query: request.query.to_string(),
            year: request.year,
            allow_vector: request.allow_vector,
            strict: request.strict,
        });
        if self.fail {
            bail!("backend unavailable");
        }
        if self.vector_only && !request.allow_vector {
            return Ok(None);
        }
        Ok(self.hit.clone().filter(|hit| !rejected.contains(&hit.image_url)))
    }
}
