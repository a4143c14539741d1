//! Summarize search traces from an image-resolve results file.
//! Usage: trace-report <results.json>

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::time::Instant;

use image_resolve::models::{ImageResult, Source, TraceOutcome};

#[derive(Parser)]
#[command(name = "trace-report")]
#[command(about = "Per-source outcome counts from resolution traces")]
struct Args {
    /// JSON array of results written by image-resolve
    results: PathBuf,
}

#[derive(Default, Clone, Copy)]
struct Counts {
    found: usize,
    not_found: usize,
    errors: usize,
    with_year: usize,
}

impl Counts {
    fn attempts(&self) -> usize {
        self.found + self.not_found + self.errors
    }

    fn merge(mut self, other: Counts) -> Counts {
        self.found += other.found;
        self.not_found += other.not_found;
        self.errors += other.errors;
        self.with_year += other.with_year;
        self
    }
}

fn count_sources(results: &[ImageResult]) -> FxHashMap<Source, Counts> {
    results
        .par_iter()
        .fold(FxHashMap::default, |mut acc: FxHashMap<Source, Counts>, result| {
            for entry in &result.trace {
                let counts = acc.entry(entry.source).or_default();
                match entry.outcome {
                    TraceOutcome::Found => counts.found += 1,
                    TraceOutcome::NotFound => counts.not_found += 1,
                    TraceOutcome::Error => counts.errors += 1,
                }
                if entry.with_year {
                    counts.with_year += 1;
                }
            }
            acc
        })
        .reduce(FxHashMap::default, |mut a, b| {
            for (source, counts) in b {
                let merged = a.get(&source).copied().unwrap_or_default().merge(counts);
                a.insert(source, merged);
            }
            a
        })
}

fn pct(part: usize, total: usize) -> f64 {
    100.0 * part as f64 / total.max(1) as f64
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();

    let text = std::fs::read_to_string(&args.results)
        .with_context(|| format!("Failed to read {:?}", args.results))?;
    let results: Vec<ImageResult> = serde_json::from_str(&text)?;

    let total = results.len();
    let found = results.par_iter().filter(|r| r.is_found()).count();
    let attempts: usize = results.par_iter().map(|r| r.trace.len()).sum();

    let by_source = count_sources(&results);
    let mut sources: Vec<(Source, Counts)> = by_source.into_iter().collect();
    sources.sort_by_key(|(source, _)| *source);

    println!("\n=== TRACE REPORT ({} queries) ===\n", total);
    println!("Found:            {:>7}  ({:.1}%)", found, pct(found, total));
    println!("Not found:        {:>7}  ({:.1}%)", total - found, pct(total - found, total));
    println!(
        "Attempts/query:   {:>7.2}",
        attempts as f64 / total.max(1) as f64
    );

    println!();
    println!("Source                     Attempts   Found  NotFound  Errors  Hit%   Year%");
    println!("───────────────────────────────────────────────────────────────────────────");
    for (source, counts) in &sources {
        println!(
            "{:<26} {:>8} {:>7} {:>9} {:>7} {:>5.1} {:>6.1}",
            source.name(),
            counts.attempts(),
            counts.found,
            counts.not_found,
            counts.errors,
            pct(counts.found, counts.attempts()),
            pct(counts.with_year, counts.attempts()),
        );
    }
    println!();
    println!("Elapsed: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
