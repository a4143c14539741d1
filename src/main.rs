use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image_resolve::models::{ImageResult, RejectionSet, ResolveStats, SearchQuery};
use image_resolve::progress::{
    create_progress_bar, format_duration, init_logging, log_progress, progress_interval,
    set_log_only,
};
use image_resolve::store::RejectionStore;
use image_resolve::{spawn_resolve, EngineConfig, Resolver};

#[derive(Parser)]
#[command(name = "image-resolve")]
#[command(about = "Resolve an illustrative image for each query in a JSON batch")]
struct Args {
    /// JSON array of queries
    queries: PathBuf,

    /// Output JSON array of results, with search traces
    output: PathBuf,

    /// Maximum concurrent resolutions
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rejection store (SQLite); rejected images are never returned
    #[arg(long)]
    rejections: Option<PathBuf>,

    /// Write batch statistics to this JSON file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Media database proxy URL (overrides config)
    #[arg(long)]
    media_db_url: Option<String>,

    /// Music catalog proxy URL (overrides config)
    #[arg(long)]
    music_catalog_url: Option<String>,

    /// Hide progress bars, log periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    #[arg(long, short)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(url) = &args.media_db_url {
        config.media_db_url = Some(url.clone());
    }
    if let Some(url) = &args.music_catalog_url {
        config.music_catalog_url = Some(url.clone());
    }
    config.validate()?;
    Ok(config)
}

fn load_rejections(args: &Args) -> Result<RejectionSet> {
    match &args.rejections {
        Some(path) => {
            let set = RejectionStore::open(path)?.load()?;
            info!("Loaded {} rejected images from {:?}", set.len(), path);
            Ok(set)
        }
        None => Ok(RejectionSet::new()),
    }
}

fn read_queries(path: &Path) -> Result<Vec<SearchQuery>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read queries {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid query batch {:?}", path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    set_log_only(args.log_only);

    if args.output == args.queries {
        bail!("Output path must differ from the query file");
    }

    let start = Instant::now();
    let config = load_config(&args)?;
    let rejected = load_rejections(&args)?;
    let queries = read_queries(&args.queries)?;
    info!("Resolving {} queries with {} workers", queries.len(), args.workers);

    // Results arrive in completion order; written back in input order
    let positions: FxHashMap<String, usize> = queries
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.clone(), i))
        .collect();

    let total = queries.len() as u64;
    let resolver = Arc::new(Resolver::from_config(&config));
    let rx = spawn_resolve(resolver, queries, args.workers, Arc::new(rejected))?;

    let pb = create_progress_bar(total, "Resolving images");
    let interval = progress_interval(total);
    let mut stats = ResolveStats::default();
    let mut results: Vec<ImageResult> = Vec::with_capacity(total as usize);
    for result in rx.iter() {
        stats.record(&result);
        pb.inc(1);
        log_progress("resolve", pb.position(), total, stats.found as u64, interval);
        results.push(result);
    }
    pb.finish_with_message(format!("Resolved {} of {} queries", stats.found, total));

    results.sort_by_key(|r| positions.get(&r.id).copied().unwrap_or(usize::MAX));
    let json = serde_json::to_string_pretty(&results)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    let elapsed = start.elapsed();
    stats.elapsed_seconds = elapsed.as_secs_f64();
    stats.log_phase("final");
    if let Some(path) = &args.stats {
        stats.write_to_file(path)?;
    }

    println!("\n{:=<60}", "");
    println!("Resolution complete!");
    println!("  Queries: {}", stats.total_queries);
    println!("  Found: {} ({:.1}%)", stats.found, stats.match_rate());
    for (source, wins) in &stats.wins_by_source {
        println!("    {:<26} {}", source, wins);
    }
    println!("  Backend errors: {}", stats.trace_errors);
    println!("  Elapsed: {}", format_duration(elapsed));
    println!("{:=<60}", "");

    Ok(())
}
