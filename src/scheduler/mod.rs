//! Bounded concurrent fetch scheduling.
//!
//! One refresh cycle spawns a task per subscribed URL; a semaphore keeps
//! at most `workers` of them in flight. Results flow back over a bounded
//! channel. Every sender clone is dropped once its task reports, so the
//! receiver draining to `None` is the completion barrier: no extra
//! bookkeeping, no lost tasks.
//!
//! Workers never touch shared collections. They fetch, parse and resolve
//! icons, then hand a self-contained [`TaskReport`] to the owner.

pub mod pipeline;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::app::SyncError;
use crate::fetcher::{CacheLayout, Fetcher, HttpFetcher};
use crate::parser::ParsedFeed;

/// One unit of work: fetch and parse a single feed URL.
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub url: String,
    /// Caching token from the registry, sent as `If-Modified-Since`.
    pub last_modified: Option<String>,
    /// Serve from disk only; never touch the network.
    pub cache_only: bool,
    /// Autodiscovery re-fetch depth. A retried task carries 1 and is
    /// never retried again.
    pub retry_depth: u8,
}

impl FetchTask {
    pub fn new(url: impl Into<String>, last_modified: Option<String>, cache_only: bool) -> Self {
        Self {
            url: url.into(),
            last_modified,
            cache_only,
            retry_depth: 0,
        }
    }
}

/// Everything the owner needs to merge one synced feed.
#[derive(Debug)]
pub struct FeedPayload {
    /// Final URL after permanent redirects; differs from the requested
    /// URL when the subscription should be renamed.
    pub canonical_url: String,
    /// Token to store for the next conditional request. Only meaningful
    /// when `not_modified` is false.
    pub last_modified: Option<String>,
    /// Server answered 304 (or cache-only hit); the stored token stays.
    pub not_modified: bool,
    /// Content came from disk, so nothing here counts as newly arrived.
    pub from_cache: bool,
    pub parsed: ParsedFeed,
    pub favicon: Option<PathBuf>,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Synced(Box<FeedPayload>),
    /// Cache-only pass, nothing on disk. Not an error.
    NotCached,
    /// The cycle was cancelled before this task started.
    Cancelled,
    Failed(SyncError),
}

/// A worker's complete result, keyed by the URL the cycle asked for
/// (not the URL a redirect or autodiscovery landed on).
#[derive(Debug)]
pub struct TaskReport {
    pub requested_url: String,
    pub outcome: TaskOutcome,
}

/// Shared, read-only context handed to every worker.
#[derive(Clone)]
pub struct TaskContext {
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub web: Arc<HttpFetcher>,
    pub cache: CacheLayout,
    pub cancel: Arc<AtomicBool>,
}

/// Launch one refresh cycle. The returned receiver yields exactly one
/// report per task and closes when all of them are in.
pub fn run_cycle(
    workers: usize,
    tasks: Vec<FetchTask>,
    ctx: TaskContext,
) -> mpsc::Receiver<TaskReport> {
    let workers = workers.max(1);
    let (tx, rx) = mpsc::channel(workers * 2);
    let semaphore = Arc::new(Semaphore::new(workers));

    for task in tasks {
        let tx = tx.clone();
        let semaphore = Arc::clone(&semaphore);
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let report = if ctx.cancel.load(Ordering::SeqCst) {
                TaskReport {
                    requested_url: task.url.clone(),
                    outcome: TaskOutcome::Cancelled,
                }
            } else {
                pipeline::sync_feed(&ctx, task).await
            };
            let _ = tx.send(report).await;
        });
    }

    rx
}
