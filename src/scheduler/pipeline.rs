//! Per-task fetch-parse-resolve pipeline.
//!
//! Runs entirely inside one worker. When a fetched document turns out not
//! to be a feed, the worker probes the page for a declared feed link and
//! re-runs itself once against the discovered URL, still under the same
//! semaphore permit. The report keeps the originally requested URL so the
//! owner can rewrite the subscription.

use std::future::Future;
use std::pin::Pin;

use crate::app::Result;
use crate::fetcher::FetchOutcome;
use crate::parser::{discovery, favicon, FeedParser};
use crate::scheduler::{FeedPayload, FetchTask, TaskContext, TaskOutcome, TaskReport};

pub fn sync_feed<'a>(
    ctx: &'a TaskContext,
    task: FetchTask,
) -> Pin<Box<dyn Future<Output = TaskReport> + Send + 'a>> {
    Box::pin(async move {
        let requested_url = task.url.clone();
        match attempt(ctx, &task).await {
            Ok(Some(payload)) => TaskReport {
                requested_url,
                outcome: TaskOutcome::Synced(Box::new(payload)),
            },
            Ok(None) => TaskReport {
                requested_url,
                outcome: TaskOutcome::NotCached,
            },
            Err(err) if err.wants_autodiscovery() && task.retry_depth == 0 && !task.cache_only => {
                match discovery::discover(&ctx.web, &task.url).await {
                    Some(found) if found != task.url => {
                        tracing::info!("`{}`: retrying as discovered feed `{found}`", task.url);
                        let retry = FetchTask {
                            url: found,
                            last_modified: None,
                            cache_only: false,
                            retry_depth: 1,
                        };
                        let mut report = sync_feed(ctx, retry).await;
                        report.requested_url = requested_url;
                        report
                    }
                    _ => TaskReport {
                        requested_url,
                        outcome: TaskOutcome::Failed(err),
                    },
                }
            }
            Err(err) => TaskReport {
                requested_url,
                outcome: TaskOutcome::Failed(err),
            },
        }
    })
}

async fn attempt(ctx: &TaskContext, task: &FetchTask) -> Result<Option<FeedPayload>> {
    match ctx
        .fetcher
        .fetch(&task.url, task.last_modified.as_deref(), task.cache_only)
        .await?
    {
        FetchOutcome::NotCached => Ok(None),
        FetchOutcome::Cached { path } => {
            let parsed = FeedParser::parse_file(&path, Some(&task.url))?;
            // Offline resolution only; a 304 must not trigger downloads.
            let favicon = favicon::resolve(&ctx.web, &ctx.cache, &parsed, true).await;
            Ok(Some(FeedPayload {
                canonical_url: task.url.clone(),
                last_modified: task.last_modified.clone(),
                not_modified: true,
                from_cache: true,
                parsed,
                favicon,
            }))
        }
        FetchOutcome::Fetched {
            path,
            canonical_url,
            last_modified,
        } => {
            let parsed = FeedParser::parse_file(&path, Some(&canonical_url))?;
            let favicon = favicon::resolve(&ctx.web, &ctx.cache, &parsed, false).await;
            Ok(Some(FeedPayload {
                canonical_url,
                last_modified,
                not_modified: false,
                from_cache: false,
                parsed,
                favicon,
            }))
        }
    }
}
