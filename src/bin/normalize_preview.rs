//! Preview how query normalization rewrites a batch, bucketed by rule.
//! Usage: normalize-preview <queries.json> [--examples N]

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

use image_resolve::models::{Language, SearchQuery};
use image_resolve::normalize::{
    normalize_query, simplify_weather_query, topic_name, COLORS_EN, COLORS_NL, DECADE_PATTERNS,
};

#[derive(Parser)]
#[command(name = "normalize-preview")]
#[command(about = "Show which normalization rule rewrites each query")]
struct Args {
    /// JSON array of queries
    queries: PathBuf,

    /// Examples printed per rule
    #[arg(long, default_value = "5")]
    examples: usize,
}

/// Rule that explains the rewrite of `query`, or "unchanged".
fn classify(query: &str, lang: Language) -> (&'static str, String) {
    if let Some(simplified) = simplify_weather_query(query, lang) {
        return ("weather", simplified);
    }

    let normalized = normalize_query(query, lang);
    let rule = if topic_name(query).is_some() {
        "topic"
    } else if normalized == query.trim() {
        "unchanged"
    } else if DECADE_PATTERNS.iter().any(|p| p.is_match(query)) {
        "decade"
    } else if match lang {
        Language::Nl => COLORS_NL.is_match(query),
        Language::En => COLORS_EN.is_match(query),
    } {
        "color"
    } else {
        "other"
    };
    (rule, normalized)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.queries)
        .with_context(|| format!("Failed to read {:?}", args.queries))?;
    let queries: Vec<SearchQuery> = serde_json::from_str(&text)?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut examples: BTreeMap<&'static str, Vec<(String, String)>> = BTreeMap::new();
    let mut total = 0usize;

    for query in &queries {
        let mut texts = vec![(query.query.as_str(), Language::Nl)];
        if let Some(en) = query.query_en.as_deref() {
            texts.push((en, Language::En));
        }

        for (text, lang) in texts {
            total += 1;
            let (rule, rewritten) = classify(text, lang);
            *counts.entry(rule).or_default() += 1;
            let bucket = examples.entry(rule).or_default();
            if bucket.len() < args.examples && rule != "unchanged" {
                bucket.push((text.to_string(), rewritten));
            }
        }
    }

    println!("\n=== NORMALIZATION PREVIEW ===\n");
    println!("Query texts: {}", total);
    for (rule, count) in &counts {
        println!(
            "{:<10} {:>7}  ({:.1}%)",
            rule,
            count,
            100.0 * *count as f64 / total.max(1) as f64
        );
    }

    println!("\n=== EXAMPLES ===\n");
    for (rule, bucket) in &examples {
        for (before, after) in bucket {
            println!("[{}] \"{}\"", rule, before);
            println!("  NEW: \"{}\"", after);
        }
    }

    Ok(())
}
