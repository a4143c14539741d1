//! Maintain the rejection store used by image-resolve.
//! Usage: reject-image <db> <url> [--reason R] [--restore]
//!        reject-image <db> --list

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use image_resolve::store::RejectionStore;

#[derive(Parser)]
#[command(name = "reject-image")]
#[command(about = "Reject or restore an image URL")]
struct Args {
    /// Rejection store (SQLite), created if missing
    db: PathBuf,

    /// Image URL to reject or restore
    url: Option<String>,

    /// Why the image was rejected
    #[arg(long)]
    reason: Option<String>,

    /// Lift an earlier rejection instead
    #[arg(long)]
    restore: bool,

    /// List all rejections
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let store = RejectionStore::open(&args.db)?;

    if args.list {
        let rejected = store.list()?;
        for image in &rejected {
            println!(
                "{}  {}  {}",
                image.rejected_at,
                image.url,
                image.reason.as_deref().unwrap_or("-")
            );
        }
        println!("{} rejected images", rejected.len());
        return Ok(());
    }

    let Some(url) = args.url.as_deref() else {
        bail!("An image URL is required unless --list is given");
    };

    if args.restore {
        if store.restore(url)? {
            println!("Restored {}", url);
        } else {
            println!("Not rejected: {}", url);
        }
    } else if store.reject(url, args.reason.as_deref())? {
        println!("Rejected {}", url);
    } else {
        println!("Already rejected: {}", url);
    }

    Ok(())
}
