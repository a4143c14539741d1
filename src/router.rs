//! Source routing.
//!
//! A query's subject is classified once into a closed [`SubjectType`]; the
//! classification picks a ladder of [`Step`]s, and resolution walks the ladder
//! until a step yields an image. Ladders are plain data so they can be
//! inspected and tested without touching any backend.

use anyhow::Result;
use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::models::{
    Category, ImageHit, ImageResult, Language, RejectionSet, SearchQuery, SearchTraceEntry, Source,
    SubjectType, TraceOutcome,
};
use crate::normalize::{extract_artist, simplify_weather_query};
use crate::safety::validate_query;
use crate::strategy::{SearchCache, Sources, StrategyRequest};

// ============================================================================
// Classification
// ============================================================================

/// Subject type used for routing.
///
/// A TV flag wins over everything so a series is never routed to the film pool.
/// Without an explicit subject, one is inferred from the flags and category.
pub fn effective_subject(query: &SearchQuery) -> SubjectType {
    if query.is_tv || query.subject_type == Some(SubjectType::TvSeries) {
        return SubjectType::TvSeries;
    }
    match query.subject_type {
        Some(subject) if subject != SubjectType::Unclassified => subject,
        _ => infer_subject(query),
    }
}

/// The music flag does not pick a subject; it only adds the music-catalog
/// step in [`plan`] and the artist retry for people.
fn infer_subject(query: &SearchQuery) -> SubjectType {
    if query.is_movie {
        return SubjectType::Film;
    }
    if query.is_celebrity {
        return SubjectType::Person;
    }
    match query.category {
        Some(Category::Lifestyle) => SubjectType::Product,
        Some(Category::Local | Category::Politics | Category::Sports | Category::Culture) => {
            SubjectType::NewsEvent
        }
        _ => SubjectType::Unclassified,
    }
}

fn is_regional(query: &SearchQuery, subject: SubjectType) -> bool {
    matches!(
        query.category,
        Some(Category::Local | Category::Politics | Category::Sports | Category::Culture)
    ) || matches!(subject, SubjectType::Location | SubjectType::Culture)
}

fn wants_archive(query: &SearchQuery) -> bool {
    matches!(query.category, Some(Category::Local | Category::Politics))
}

fn is_music(query: &SearchQuery) -> bool {
    query.is_music || query.category == Some(Category::Music)
}

// ============================================================================
// Ladders
// ============================================================================

/// Which text of the query a step searches with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryText {
    /// The local-language query.
    Local,
    /// The international query, or the local one when there is none.
    International,
    /// The "artist - title" music query.
    Music,
    /// Only the artist part of the music query.
    Artist,
}

/// One strategy call on a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub source: Source,
    pub text: QueryText,
    pub with_year: bool,
    pub strict: bool,
    pub allow_vector: bool,
}

impl Step {
    fn new(source: Source, text: QueryText) -> Self {
        Self {
            source,
            text,
            with_year: false,
            strict: true,
            allow_vector: false,
        }
    }

    fn with_year(mut self) -> Self {
        self.with_year = true;
        self
    }

    fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    fn vector(mut self) -> Self {
        self.allow_vector = true;
        self
    }
}

/// Products, logos and artwork: no year, lenient throughout.
fn object_ladder(allow_vector: bool) -> Vec<Step> {
    [
        Step::new(Source::Commons, QueryText::International),
        Step::new(Source::InternationalWikipedia, QueryText::International),
        Step::new(Source::LocalWikipedia, QueryText::Local),
    ]
    .into_iter()
    .map(|step| {
        let step = step.lenient();
        if allow_vector {
            step.vector()
        } else {
            step
        }
    })
    .collect()
}

/// Local-language sources before international ones, with year then without.
fn regional_ladder(with_archive: bool) -> Vec<Step> {
    let mut steps = Vec::new();
    if with_archive {
        steps.push(Step::new(Source::NationalArchive, QueryText::Local).with_year());
    }
    steps.extend([
        Step::new(Source::LocalWikipedia, QueryText::Local).with_year(),
        Step::new(Source::Commons, QueryText::Local).with_year(),
        Step::new(Source::LocalWikipedia, QueryText::Local),
        Step::new(Source::Commons, QueryText::Local),
        Step::new(Source::InternationalWikipedia, QueryText::International).with_year(),
        Step::new(Source::InternationalWikipedia, QueryText::International),
    ]);
    steps
}

/// International sources first, local encyclopedia last.
fn default_ladder() -> Vec<Step> {
    vec![
        Step::new(Source::InternationalWikipedia, QueryText::International).with_year(),
        Step::new(Source::Commons, QueryText::International).with_year(),
        Step::new(Source::InternationalWikipedia, QueryText::International),
        Step::new(Source::Commons, QueryText::International),
        Step::new(Source::LocalWikipedia, QueryText::Local),
    ]
}

/// Generic ladder picked by category; also the fall-through after a TV miss.
fn general_ladder(query: &SearchQuery, subject: SubjectType) -> Vec<Step> {
    if is_regional(query, subject) {
        regional_ladder(wants_archive(query))
    } else {
        default_ladder()
    }
}

/// Ordered strategy calls for a query.
///
/// Music queries (flag or category) with an "artist - title" text try the
/// music catalog first, whatever their subject.
pub fn plan(query: &SearchQuery) -> Vec<Step> {
    let subject = effective_subject(query);
    let mut steps = Vec::new();

    let has_music_query = query
        .music_query
        .as_deref()
        .is_some_and(|q| !q.trim().is_empty());
    if is_music(query) && has_music_query {
        steps.push(Step::new(Source::MusicCatalog, QueryText::Music));
    }

    match subject {
        SubjectType::TvSeries => {
            steps.push(Step::new(Source::MediaDbTv, QueryText::International).with_year());
            steps.extend(general_ladder(query, subject));
        }
        SubjectType::Film => {
            steps.push(Step::new(Source::MediaDbMovie, QueryText::International).with_year());
        }
        SubjectType::Person => {
            steps.push(Step::new(Source::MediaDbPerson, QueryText::Local));
            if is_music(query) && has_music_query {
                steps.push(Step::new(Source::MediaDbPerson, QueryText::Artist));
            }
            steps.extend([
                Step::new(Source::Commons, QueryText::International),
                Step::new(Source::InternationalWikipedia, QueryText::International),
                Step::new(Source::LocalWikipedia, QueryText::Local),
            ]);
        }
        SubjectType::Product | SubjectType::Logo => {
            steps.extend(object_ladder(false));
            steps.extend(object_ladder(true));
        }
        SubjectType::Artwork => steps.extend(object_ladder(false)),
        _ => steps.extend(general_ladder(query, subject)),
    }

    if query.year.is_none() {
        for step in &mut steps {
            step.with_year = false;
        }
        let mut seen: Vec<Step> = Vec::with_capacity(steps.len());
        steps.retain(|step| {
            if seen.contains(step) {
                false
            } else {
                seen.push(*step);
                true
            }
        });
    }

    steps
}

fn is_encyclopedia(source: Source) -> bool {
    matches!(
        source,
        Source::Commons
            | Source::LocalWikipedia
            | Source::InternationalWikipedia
            | Source::NationalArchive
    )
}

// ============================================================================
// Resolution
// ============================================================================

/// Walks ladders over a fixed set of strategies. Shared read-only by all workers.
pub struct Resolver {
    sources: Sources,
    local_language: Language,
    international_language: Language,
}

impl Resolver {
    pub fn new(
        sources: Sources,
        local_language: Language,
        international_language: Language,
    ) -> Self {
        Self {
            sources,
            local_language,
            international_language,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Sources::from_config(config),
            config.local_language,
            config.international_language,
        )
    }

    /// Resolve one query. Fails only when the query itself is invalid;
    /// "nothing found" is a result with no image.
    pub fn resolve(&self, query: &SearchQuery, rejected: &RejectionSet) -> Result<ImageResult> {
        validate_query(query)?;
        Ok(self.resolve_validated(query, rejected))
    }

    pub(crate) fn resolve_validated(
        &self,
        query: &SearchQuery,
        rejected: &RejectionSet,
    ) -> ImageResult {
        let cache = SearchCache::new();
        let mut trace = Vec::new();
        let hit = plan(query)
            .iter()
            .find_map(|step| self.attempt(step, query, rejected, &cache, &mut trace));

        match &hit {
            Some(hit) => info!("[{}] Resolved: {}", query.id, hit.image_url),
            None => debug!("[{}] No image after {} attempts", query.id, trace.len()),
        }

        let (image_url, source_url) = match hit {
            Some(hit) => (Some(hit.image_url), hit.source_url),
            None => (None, None),
        };
        ImageResult {
            id: query.id.clone(),
            image_url,
            source_url,
            trace,
        }
    }

    /// Text and language a step searches with, or None if the step does not apply.
    fn step_text(&self, step: &Step, query: &SearchQuery) -> Option<(String, Language)> {
        let (text, language) = match step.text {
            QueryText::Local => (query.query.trim().to_string(), self.local_language),
            QueryText::International => match query.query_en.as_deref().map(str::trim) {
                Some(en) if !en.is_empty() => (en.to_string(), self.international_language),
                _ => (query.query.trim().to_string(), self.local_language),
            },
            QueryText::Music => (
                query.music_query.as_deref()?.trim().to_string(),
                self.international_language,
            ),
            QueryText::Artist => {
                let artist = extract_artist(query.music_query.as_deref()?)?;
                if artist.eq_ignore_ascii_case(query.query.trim()) {
                    return None;
                }
                (artist, self.local_language)
            }
        };
        if text.is_empty() {
            return None;
        }

        if is_encyclopedia(step.source) {
            if let Some(simplified) = simplify_weather_query(&text, language) {
                return Some((simplified, language));
            }
        }
        Some((text, language))
    }

    fn attempt(
        &self,
        step: &Step,
        query: &SearchQuery,
        rejected: &RejectionSet,
        cache: &SearchCache,
        trace: &mut Vec<SearchTraceEntry>,
    ) -> Option<ImageHit> {
        let Some(strategy) = self.sources.get(step.source) else {
            debug!("[{}] Source {} not configured", query.id, step.source);
            return None;
        };
        let (text, language) = self.step_text(step, query)?;

        let request = StrategyRequest {
            query: &text,
            language,
            year: if step.with_year { query.year } else { None },
            allow_vector: step.allow_vector,
            strict: step.strict,
            cache,
        };

        let (outcome, hit) = match strategy.search(&request, rejected) {
            Ok(Some(hit)) => (TraceOutcome::Found, Some(hit)),
            Ok(None) => (TraceOutcome::NotFound, None),
            Err(e) => {
                warn!("[{}] {} failed: {:#}", query.id, step.source, e);
                (TraceOutcome::Error, None)
            }
        };

        trace.push(SearchTraceEntry {
            source: step.source,
            query: strategy.effective_query(&request),
            with_year: request.year.is_some(),
            outcome,
        });
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MediaKind;
    use crate::strategy::{EncyclopediaStrategy, ImageStrategy, MediaDbStrategy, DEFAULT_PHASES};
    use crate::test_utils::{FakeEncyclopedia, FakeMediaDb, MockStrategy};
    use std::sync::Arc;

    const ALL_SOURCES: [Source; 8] = [
        Source::Commons,
        Source::LocalWikipedia,
        Source::InternationalWikipedia,
        Source::NationalArchive,
        Source::MediaDbPerson,
        Source::MediaDbMovie,
        Source::MediaDbTv,
        Source::MusicCatalog,
    ];

    /// Resolver over mocks that all miss, except the ones given.
    fn resolver_with(overrides: Vec<Arc<MockStrategy>>) -> (Resolver, Vec<Arc<MockStrategy>>) {
        let mut mocks = Vec::new();
        let mut sources = Sources::new();
        for source in ALL_SOURCES {
            let mock = overrides
                .iter()
                .find(|m| m.source() == source)
                .cloned()
                .unwrap_or_else(|| Arc::new(MockStrategy::miss(source)));
            sources.insert(mock.clone());
            mocks.push(mock);
        }
        (Resolver::new(sources, Language::Nl, Language::En), mocks)
    }

    fn mock(mocks: &[Arc<MockStrategy>], source: Source) -> &MockStrategy {
        let index = ALL_SOURCES.iter().position(|s| *s == source).unwrap();
        &mocks[index]
    }

    fn sources_of(steps: &[Step]) -> Vec<Source> {
        steps.iter().map(|s| s.source).collect()
    }

    #[test]
    fn test_effective_subject() {
        let tv = SearchQuery::new("a", "Dallas").with_subject(SubjectType::Film);
        assert_eq!(effective_subject(&SearchQuery { is_tv: true, ..tv }), SubjectType::TvSeries);

        let q = SearchQuery { is_movie: true, ..SearchQuery::new("b", "Titanic") };
        assert_eq!(effective_subject(&q), SubjectType::Film);

        let q = SearchQuery::new("c", "rode fiets").with_category(Category::Lifestyle);
        assert_eq!(effective_subject(&q), SubjectType::Product);

        let q = SearchQuery::new("d", "Ajax").with_category(Category::Sports);
        assert_eq!(effective_subject(&q), SubjectType::NewsEvent);

        let q = SearchQuery::new("e", "Maanlanding").with_subject(SubjectType::Unclassified);
        assert_eq!(effective_subject(&q), SubjectType::Unclassified);
    }

    #[test]
    fn test_tv_plan_never_uses_film_pool() {
        let q = SearchQuery::new("a", "Dallas")
            .with_year(1981)
            .with_subject(SubjectType::TvSeries);
        let steps = plan(&q);
        assert_eq!(steps[0].source, Source::MediaDbTv);
        assert!(steps[0].with_year);
        assert!(!sources_of(&steps).contains(&Source::MediaDbMovie));
        assert!(sources_of(&steps).contains(&Source::LocalWikipedia));
        assert!(sources_of(&steps).contains(&Source::InternationalWikipedia));
    }

    #[test]
    fn test_film_plan_has_no_fallback() {
        let q = SearchQuery::new("a", "Turks Fruit")
            .with_subject(SubjectType::Film)
            .with_year(1973);
        assert_eq!(sources_of(&plan(&q)), vec![Source::MediaDbMovie]);
    }

    #[test]
    fn test_product_plan_is_lenient_yearless_then_vector() {
        let q = SearchQuery::new("a", "rode fiets")
            .with_subject(SubjectType::Product)
            .with_year(1985);
        let steps = plan(&q);
        assert_eq!(steps.len(), 6);
        assert!(steps.iter().all(|s| !s.with_year && !s.strict));
        assert!(steps[..3].iter().all(|s| !s.allow_vector));
        assert!(steps[3..].iter().all(|s| s.allow_vector));

        let artwork = SearchQuery::new("b", "Nachtwacht").with_subject(SubjectType::Artwork);
        assert!(plan(&artwork).iter().all(|s| !s.allow_vector));
    }

    #[test]
    fn test_regional_plan_puts_local_first() {
        let q = SearchQuery::new("a", "Watersnoodramp")
            .with_category(Category::Politics)
            .with_year(1953);
        let steps = plan(&q);
        assert_eq!(steps[0].source, Source::NationalArchive);
        assert_eq!(steps[1].source, Source::LocalWikipedia);
        assert!(steps[1].with_year);
        let first_international = sources_of(&steps)
            .iter()
            .position(|s| *s == Source::InternationalWikipedia)
            .unwrap();
        assert!(first_international > 4);

        let sports = SearchQuery::new("b", "Elfstedentocht").with_category(Category::Sports);
        assert!(!sources_of(&plan(&sports)).contains(&Source::NationalArchive));
    }

    #[test]
    fn test_plan_without_year_drops_duplicates() {
        let q = SearchQuery::new("a", "Maanlanding");
        let steps = plan(&q);
        assert!(steps.iter().all(|s| !s.with_year));
        assert_eq!(
            sources_of(&steps),
            vec![Source::InternationalWikipedia, Source::Commons, Source::LocalWikipedia]
        );
    }

    #[test]
    fn test_tv_miss_falls_through_without_film() {
        let (resolver, mocks) = resolver_with(vec![]);
        let q = SearchQuery::new("a", "Dallas")
            .with_year(1981)
            .with_subject(SubjectType::TvSeries);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();

        assert_eq!(result.image_url, None);
        assert_eq!(mock(&mocks, Source::MediaDbTv).calls(), 1);
        assert_eq!(mock(&mocks, Source::MediaDbMovie).calls(), 0);
        assert!(mock(&mocks, Source::LocalWikipedia).calls() > 0);
        assert!(mock(&mocks, Source::InternationalWikipedia).calls() > 0);
        assert_eq!(result.trace.len(), plan(&q).len());
        assert!(result.trace.iter().all(|e| e.outcome == TraceOutcome::NotFound));
    }

    #[test]
    fn test_film_never_calls_tv_pool() {
        let (resolver, mocks) = resolver_with(vec![]);
        let q = SearchQuery::new("a", "Turks Fruit").with_subject(SubjectType::Film);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();
        assert_eq!(result.image_url, None);
        assert_eq!(result.trace.len(), 1);
        assert_eq!(mock(&mocks, Source::MediaDbMovie).calls(), 1);
        assert_eq!(mock(&mocks, Source::MediaDbTv).calls(), 0);
        assert_eq!(mock(&mocks, Source::Commons).calls(), 0);
    }

    #[test]
    fn test_music_catalog_first() {
        let catalog = Arc::new(MockStrategy::hit(
            Source::MusicCatalog,
            "https://cdn.example/bom.jpg",
        ));
        let (resolver, mocks) = resolver_with(vec![catalog]);
        let q = SearchQuery::new("a", "Doe Maar")
            .with_category(Category::Music)
            .with_music_query("Doe Maar - De Bom");
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://cdn.example/bom.jpg"));
        assert_eq!(result.winning_source(), Some(Source::MusicCatalog));
        assert_eq!(result.trace.len(), 1);
        assert_eq!(
            mock(&mocks, Source::MusicCatalog).requests()[0].query,
            "Doe Maar - De Bom"
        );
    }

    #[test]
    fn test_music_flag_routes_to_catalog_without_category() {
        let q = SearchQuery {
            is_music: true,
            ..SearchQuery::new("a", "De Bom").with_music_query("Doe Maar - De Bom")
        };
        let steps = plan(&q);
        assert_eq!(steps[0].source, Source::MusicCatalog);
        assert_eq!(steps[0].text, QueryText::Music);

        let without_text = SearchQuery {
            is_music: true,
            ..SearchQuery::new("b", "De Bom")
        };
        assert!(!sources_of(&plan(&without_text)).contains(&Source::MusicCatalog));
    }

    #[test]
    fn test_person_retries_with_artist_name() {
        let q = SearchQuery {
            is_celebrity: true,
            ..SearchQuery::new("a", "Doe Maar in Ahoy")
                .with_category(Category::Music)
                .with_music_query("Doe Maar - De Bom")
        };
        let (resolver, mocks) = resolver_with(vec![]);
        resolver.resolve(&q, &RejectionSet::new()).unwrap();

        let person = mock(&mocks, Source::MediaDbPerson).requests();
        assert_eq!(person.len(), 2);
        assert_eq!(person[0].query, "Doe Maar in Ahoy");
        assert_eq!(person[1].query, "Doe Maar");
        assert!(person.iter().all(|r| r.year.is_none()));
    }

    #[test]
    fn test_product_vector_pass_after_raster_pass() {
        let commons = Arc::new(
            MockStrategy::hit(
                Source::Commons,
                "https://upload.example/thumb/Fiets.svg/640px-Fiets.svg.png",
            )
            .vector_only(),
        );
        let (resolver, mocks) = resolver_with(vec![commons]);
        let q = SearchQuery::new("a", "rode fiets")
            .with_subject(SubjectType::Product)
            .with_year(1985);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();

        assert!(result.is_found());
        let requests = mock(&mocks, Source::Commons).requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].allow_vector && requests[1].allow_vector);
        assert!(requests.iter().all(|r| r.year.is_none() && !r.strict));
        assert_eq!(result.trace.len(), 4);
        assert!(result.trace.iter().all(|e| !e.with_year));
    }

    #[test]
    fn test_backend_error_is_traced_and_resolution_continues() {
        let failing = Arc::new(MockStrategy::failing(Source::InternationalWikipedia));
        let commons = Arc::new(MockStrategy::hit(
            Source::Commons,
            "https://upload.example/maan.jpg",
        ));
        let (resolver, _) = resolver_with(vec![failing, commons]);
        let q = SearchQuery::new("a", "Maanlanding").with_year(1969);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://upload.example/maan.jpg"));
        assert_eq!(result.trace[0].outcome, TraceOutcome::Error);
        assert!(result.trace[0].with_year);
        assert_eq!(result.trace[1].source, Source::Commons);
        assert_eq!(result.trace[1].outcome, TraceOutcome::Found);
    }

    #[test]
    fn test_international_text_used_when_present() {
        let (resolver, mocks) = resolver_with(vec![]);
        let q = SearchQuery::new("a", "Maanlanding").with_query_en("Moon landing");
        resolver.resolve(&q, &RejectionSet::new()).unwrap();
        let international = mock(&mocks, Source::InternationalWikipedia).requests();
        assert_eq!(international[0].query, "Moon landing");
        assert_eq!(mock(&mocks, Source::LocalWikipedia).requests()[0].query, "Maanlanding");
    }

    #[test]
    fn test_weather_query_simplified_for_encyclopedias() {
        let (resolver, mocks) = resolver_with(vec![]);
        let q = SearchQuery::new("a", "Koudegolf")
            .with_query_en("Cold Spell Utrecht 1987")
            .with_year(1987);
        resolver.resolve(&q, &RejectionSet::new()).unwrap();
        let international = mock(&mocks, Source::InternationalWikipedia).requests();
        assert_eq!(international[0].query, "cold spell");
    }

    #[test]
    fn test_rejected_tv_hit_falls_through_to_encyclopedias() {
        let db = Arc::new(
            FakeMediaDb::new().with_hit(MediaKind::Tv, "https://image.example/dallas.jpg"),
        );
        let mut sources = Sources::new();
        sources.insert(Arc::new(MediaDbStrategy::new(MediaKind::Tv, db.clone())));
        sources.insert(Arc::new(MediaDbStrategy::new(MediaKind::Movie, db.clone())));
        sources.insert(Arc::new(MockStrategy::hit(
            Source::Commons,
            "https://upload.example/dallas.jpg",
        )));
        sources.insert(Arc::new(MockStrategy::miss(Source::LocalWikipedia)));
        sources.insert(Arc::new(MockStrategy::miss(Source::InternationalWikipedia)));
        let resolver = Resolver::new(sources, Language::Nl, Language::En);

        let q = SearchQuery::new("a", "Dallas")
            .with_year(1981)
            .with_subject(SubjectType::TvSeries);
        let rejected: RejectionSet = ["https://image.example/dallas.jpg"].into_iter().collect();
        let result = resolver.resolve(&q, &rejected).unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://upload.example/dallas.jpg"));
        assert_eq!(result.trace[0].source, Source::MediaDbTv);
        assert_eq!(result.trace[0].outcome, TraceOutcome::NotFound);
        assert_eq!(result.winning_source(), Some(Source::Commons));
        assert_eq!(db.calls(MediaKind::Tv), 1);
        assert_eq!(db.calls(MediaKind::Movie), 0);
    }

    #[test]
    fn test_repeated_searches_are_skipped_within_one_resolution() {
        let archive = Arc::new(FakeEncyclopedia::new());
        let local = Arc::new(FakeEncyclopedia::new());
        let commons = Arc::new(FakeEncyclopedia::new());
        let international = Arc::new(FakeEncyclopedia::new());

        let mut sources = Sources::new();
        sources.insert(Arc::new(
            EncyclopediaStrategy::new(Source::NationalArchive, archive.clone(), &DEFAULT_PHASES, 5)
                .with_qualifier("Nationaal Archief"),
        ));
        for (source, fake) in [
            (Source::LocalWikipedia, &local),
            (Source::Commons, &commons),
            (Source::InternationalWikipedia, &international),
        ] {
            sources.insert(Arc::new(EncyclopediaStrategy::new(
                source,
                fake.clone(),
                &DEFAULT_PHASES,
                5,
            )));
        }
        let resolver = Resolver::new(sources, Language::Nl, Language::En);

        let q = SearchQuery::new("a", "Zeelandbrug")
            .with_category(Category::Local)
            .with_year(1965);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();
        assert_eq!(result.image_url, None);
        assert_eq!(result.trace.len(), 7);

        assert_eq!(archive.search_calls(), 3);
        for fake in [&local, &commons, &international] {
            let searched = fake.searched();
            let mut unique = searched.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), searched.len(), "repeated search in {:?}", searched);
            assert_eq!(searched.len(), 4);
        }

        // A fresh resolution searches again.
        resolver.resolve(&q, &RejectionSet::new()).unwrap();
        assert_eq!(archive.search_calls(), 6);
    }

    #[test]
    fn test_trace_records_whether_step_passed_year() {
        let (resolver, _) = resolver_with(vec![]);
        let q = SearchQuery::new("a", "Zeelandbrug")
            .with_category(Category::Sports)
            .with_year(1965);
        let result = resolver.resolve(&q, &RejectionSet::new()).unwrap();
        let with_year: Vec<bool> = result.trace.iter().map(|e| e.with_year).collect();
        assert_eq!(with_year, vec![true, true, false, false, true, false]);
    }

    #[test]
    fn test_empty_query_fails_fast() {
        let (resolver, mocks) = resolver_with(vec![]);
        assert!(resolver.resolve(&SearchQuery::new("a", "  "), &RejectionSet::new()).is_err());
        assert!(mocks.iter().all(|m| m.calls() == 0));
    }
}
