//! Content matching for search candidates.
//!
//! Decides whether a candidate's title/snippet is about the same subject as
//! the query. Strict matching requires every meaningful query token to appear
//! in title+snippet, falling back to one token in the title; lenient matching
//! accepts one token in the title.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::normalize::fold_to_ascii;

// ============================================================================
// Tokenization
// ============================================================================

/// Tokens must be longer than this to count.
pub const MIN_TOKEN_LEN: usize = 2;

/// Dutch and English function words, ASCII-folded.
pub static STOPWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        // Dutch
        "het", "een", "van", "voor", "bij", "aan", "uit", "door", "over", "naar", "met", "als",
        "dat", "die", "dit", "wat", "wordt", "werd", "worden", "zijn", "was", "waren", "ook",
        "tot", "maar", "nog", "niet", "geen", "hun", "haar", "zich", "onder", "tegen", "tussen",
        "eerste", "nieuwe", "nieuw", "grote", "groot", "jaar", "jaren", "wie", "waar", "hoe",
        "onze", "deze", "meer", "veel", "heel",
        // English
        "the", "and", "for", "with", "from", "into", "that", "this", "was", "were", "are", "his",
        "her", "its", "their", "has", "had", "have", "not", "but", "who", "what", "when", "where",
        "how", "new", "first", "year", "years", "over", "under", "about", "after", "before",
        "during", "between", "against", "out", "off", "one",
    ]
    .into_iter()
    .collect()
});

/// Search highlight markup in snippets: `<span class="searchmatch">`.
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Remove markup and decode the few entities search snippets contain.
pub fn strip_html(s: &str) -> String {
    HTML_TAG
        .replace_all(s, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}

/// Meaningful tokens of a query: folded, longer than two characters,
/// not a stopword, not a bare four-digit year. Order of first appearance.
pub fn query_tokens(query: &str) -> Vec<String> {
    let folded = fold_to_ascii(query);
    let mut seen = FxHashSet::default();
    NON_WORD
        .split(&folded)
        .filter(|t| t.len() > MIN_TOKEN_LEN)
        .filter(|t| !STOPWORDS.contains(t))
        .filter(|t| !is_year_token(t))
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Matching
// ============================================================================

/// Check whether a candidate matches the query.
///
/// Returns true when the query has no meaningful tokens.
pub fn content_matches(title: &str, snippet: &str, query: &str, strict: bool) -> bool {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return true;
    }

    let title_norm = fold_to_ascii(&strip_html(title));
    let any_in_title = || tokens.iter().any(|t| title_norm.contains(t.as_str()));

    if !strict {
        return any_in_title();
    }

    // Context like "Apollo 11" often sits only in the snippet
    let combined = format!("{} {}", title_norm, fold_to_ascii(&strip_html(snippet)));
    if tokens.iter().all(|t| combined.contains(t.as_str())) {
        return true;
    }

    any_in_title()
}
