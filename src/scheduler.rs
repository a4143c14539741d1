//! Concurrency-bounded batch resolution.
//!
//! A fixed pool of worker threads claims queries through a shared atomic
//! cursor and sends each finished [`ImageResult`] down a channel. Callers
//! either consume the channel themselves ([`spawn_resolve`]) or get a
//! callback per result on their own thread ([`resolve_all`]).

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::models::{ImageResult, RejectionSet, SearchQuery};
use crate::router::Resolver;
use crate::safety::validate_batch;

/// Claim queries until the cursor runs past the end or the receiver is gone.
fn worker_loop(
    worker_id: usize,
    resolver: &Resolver,
    queries: &[SearchQuery],
    cursor: &AtomicUsize,
    rejected: &RejectionSet,
    tx: &Sender<ImageResult>,
) {
    let mut resolved = 0usize;
    loop {
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(query) = queries.get(index) else {
            break;
        };
        let result = resolver.resolve_validated(query, rejected);
        resolved += 1;
        if tx.send(result).is_err() {
            debug!("Worker {}: receiver dropped, stopping", worker_id);
            break;
        }
    }
    debug!("Worker {} done after {} queries", worker_id, resolved);
}

/// Resolve a batch with exactly `max_concurrent` workers.
///
/// `on_result` runs on the calling thread as results complete. Completion
/// order is not input order; match results to queries by `id`.
pub fn resolve_all<F>(
    resolver: &Resolver,
    queries: &[SearchQuery],
    max_concurrent: usize,
    rejected: &RejectionSet,
    mut on_result: F,
) -> Result<Vec<ImageResult>>
where
    F: FnMut(&ImageResult),
{
    validate_batch(queries, max_concurrent)?;

    let cursor = AtomicUsize::new(0);
    let (tx, rx) = bounded::<ImageResult>(max_concurrent);
    let mut results = Vec::with_capacity(queries.len());

    std::thread::scope(|scope| {
        for worker_id in 0..max_concurrent {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || worker_loop(worker_id, resolver, queries, cursor, rejected, &tx));
        }
        drop(tx); // channel closes when the last worker exits

        for result in rx.iter() {
            on_result(&result);
            results.push(result);
        }
    });

    Ok(results)
}

/// Start resolving a batch in the background and stream the results.
///
/// The receiver yields one result per query and disconnects when the batch is
/// done. Dropping it makes the workers stop after their current query.
pub fn spawn_resolve(
    resolver: Arc<Resolver>,
    queries: Vec<SearchQuery>,
    max_concurrent: usize,
    rejected: Arc<RejectionSet>,
) -> Result<Receiver<ImageResult>> {
    validate_batch(&queries, max_concurrent)?;

    let queries = Arc::new(queries);
    let cursor = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = bounded::<ImageResult>(max_concurrent);

    for worker_id in 0..max_concurrent {
        let resolver = Arc::clone(&resolver);
        let queries = Arc::clone(&queries);
        let cursor = Arc::clone(&cursor);
        let rejected = Arc::clone(&rejected);
        let tx = tx.clone();
        std::thread::spawn(move || {
            worker_loop(worker_id, &resolver, &queries, &cursor, &rejected, &tx)
        });
    }

    Ok(rx)
}
