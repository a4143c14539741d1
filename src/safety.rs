//! Safety checks at the engine's edges.
//!
//! - File-type filtering of candidate media URLs (no audio/video/documents,
//!   vector art only where the caller allows it).
//! - Contract validation of queries and batches, which fails fast instead of
//!   being absorbed as "not found".

use anyhow::{bail, Result};
use rustc_hash::FxHashSet;

use crate::models::SearchQuery;

/// Never acceptable as an illustration, whatever the subject.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    "ogg", "oga", "ogv", "opus", "webm", "mp3", "wav", "flac", "mid", "midi", "mp4", "m4a", "mpg",
    "mpeg", "mov", "avi", "pdf", "djvu", "stl",
];

/// Scalable line art; allowed for logos and products only.
pub const VECTOR_EXTENSIONS: &[&str] = &["svg"];

/// Path segment used by transcoded audio/video derivatives.
const TRANSCODED_MARKER: &str = "/transcoded/";

fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(scheme_end) => {
            let rest = &without_query[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("")
        }
        None => without_query,
    }
}

/// All dotted suffixes in a path: "thumb/Logo.svg/640px-Logo.svg.png" → svg, svg, png
fn path_extensions(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/')
        .flat_map(|segment| segment.split('.').skip(1))
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check whether a resolved media URL may be used as an image.
///
/// Thumbnail URLs keep the original file name in their path, so a PNG
/// rendering of an SVG is still treated as vector art.
pub fn is_allowed_url(url: &str, allow_vector: bool) -> bool {
    if url.trim().is_empty() {
        return false;
    }
    let path = url_path(url);
    if path.to_ascii_lowercase().contains(TRANSCODED_MARKER) {
        return false;
    }
    for ext in path_extensions(path) {
        if BLOCKED_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
        if !allow_vector && VECTOR_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
    }
    true
}

/// Cheap pre-check on a candidate title ("File:Speech.ogg") before any
/// follow-up request is spent on it.
pub fn has_blocked_title_extension(title: &str, allow_vector: bool) -> bool {
    let Some((_, ext)) = title.trim().rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    BLOCKED_EXTENSIONS.contains(&ext.as_str())
        || (!allow_vector && VECTOR_EXTENSIONS.contains(&ext.as_str()))
}

/// Validates a single query.
///
/// # Returns
/// * `Ok(())` if the query can be resolved
/// * `Err` with a descriptive message if the query text is empty
pub fn validate_query(query: &SearchQuery) -> Result<()> {
    if query.query.trim().is_empty() {
        bail!("Invalid query '{}': query text must not be empty", query.id);
    }
    Ok(())
}

/// Validates a batch before any work is scheduled.
///
/// Checks:
/// - every query passes [`validate_query`]
/// - identifiers are unique within the batch
/// - the worker cap is at least one
pub fn validate_batch(queries: &[SearchQuery], max_concurrent: usize) -> Result<()> {
    if max_concurrent == 0 {
        bail!("Invalid batch: max_concurrent must be at least 1");
    }

    let mut seen = FxHashSet::default();
    for query in queries {
        validate_query(query)?;
        if !seen.insert(query.id.as_str()) {
            bail!("Invalid batch: duplicate query id '{}'", query.id);
        }
    }

    Ok(())
}
