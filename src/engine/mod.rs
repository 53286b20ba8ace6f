//! The synchronization engine.
//!
//! [`SyncEngine`] owns every piece of mutable state: the feed registry,
//! the article store, the thumbnail map. Workers spawned for a refresh
//! cycle only ever see the shared HTTP client and cache; their results
//! come back as reports that the engine applies serially, so no lock
//! guards any collection.

pub mod auto_refresh;
pub mod events;
pub mod service;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::app::{Result, SyncError};
use crate::config::Config;
use crate::fetcher::{connectivity, CacheLayout, Fetcher, HttpFetcher};
use crate::parser::thumb::{self, ThumbCache};
use crate::registry::{FeedEntry, FeedRegistry};
use crate::scheduler::{self, pipeline, FetchTask, TaskContext, TaskOutcome, TaskReport};
use crate::store::ArticleStore;

pub use events::{RefreshEvent, RefreshReason, RefreshSummary};

const EVENT_CAPACITY: usize = 64;

pub struct SyncEngine {
    config: Config,
    registry: FeedRegistry,
    store: ArticleStore,
    thumbs: ThumbCache,
    cache: CacheLayout,
    web: Arc<HttpFetcher>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    events: broadcast::Sender<RefreshEvent>,
    cancel: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config
            .cache_dir()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        let data_dir = config
            .data_dir()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let cache = CacheLayout::new(&cache_dir)?;
        let registry = FeedRegistry::load(data_dir.join("feeds.json"))?;
        let thumbs = ThumbCache::load(data_dir.join("thumbnails.json"))?;
        let web = Arc::new(HttpFetcher::new(cache.clone(), config.request_timeout()));
        let fetcher: Arc<dyn Fetcher + Send + Sync> = web.clone();
        let store = ArticleStore::new(config.view.show_read_items, config.view.new_first);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config,
            registry,
            store,
            thumbs,
            cache,
            web,
            fetcher,
            events,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ArticleStore {
        &mut self.store
    }

    /// Handle for requesting cooperative cancellation from another task.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<RefreshEvent> {
        self.events.clone()
    }

    /// Run one refresh cycle. A startup cycle only touches the network
    /// when configured to.
    pub async fn refresh(&mut self, reason: RefreshReason) -> RefreshSummary {
        let cache_only =
            reason == RefreshReason::Startup && !self.config.refresh.refresh_on_startup;
        self.refresh_with(reason, cache_only).await
    }

    async fn refresh_with(&mut self, reason: RefreshReason, mut cache_only: bool) -> RefreshSummary {
        // Consumed once per cycle; config edits apply on the next one.
        let workers = self.config.refresh.max_refresh_threads;
        let max_age = self.config.max_article_age();

        tracing::info!("refresh started ({})", reason.as_str());
        let _ = self.events.send(RefreshEvent::RefreshStarted { reason });

        if !cache_only {
            let online =
                connectivity::is_online(self.web.client(), &self.config.network.probe_url).await;
            let _ = self.events.send(RefreshEvent::OnlineChanged(online));
            if !online {
                tracing::warn!("offline; loading cached feeds only");
                cache_only = true;
            }
        }

        let tasks: Vec<FetchTask> = self
            .registry
            .feed_urls()
            .into_iter()
            .map(|url| {
                let token = self.registry.last_modified(&url);
                FetchTask::new(url, token, cache_only)
            })
            .collect();

        let mut rx = scheduler::run_cycle(workers, tasks, self.task_context());

        let mut summary = RefreshSummary::default();
        while let Some(report) = rx.recv().await {
            // A cancelled cycle still drains to the barrier, but late
            // results are discarded rather than half-applied.
            if self.cancel.load(Ordering::SeqCst) {
                continue;
            }
            self.apply_report(report, max_age, &mut summary);
        }

        self.store
            .evict_older_than(max_age, Utc::now(), &mut self.registry);
        if let Err(e) = self.registry.save() {
            tracing::error!("failed to save feed registry: {e}");
        }

        tracing::info!(
            "refresh ended: {} new items, {} feeds failed",
            summary.new_items,
            summary.problematic_feeds.len()
        );
        let _ = self.events.send(RefreshEvent::RefreshEnded {
            summary: summary.clone(),
        });
        summary
    }

    fn apply_report(&mut self, report: TaskReport, max_age: chrono::Duration, summary: &mut RefreshSummary) {
        match report.outcome {
            TaskOutcome::Synced(payload) => {
                let payload = *payload;
                if payload.canonical_url != report.requested_url {
                    tracing::info!(
                        "feed `{}` moved permanently to `{}`",
                        report.requested_url,
                        payload.canonical_url
                    );
                    self.registry
                        .rename(&report.requested_url, &payload.canonical_url);
                }
                if !payload.not_modified {
                    self.registry
                        .set_last_modified(&payload.canonical_url, payload.last_modified.clone());
                }
                let added = self.store.merge_feed(
                    payload.parsed,
                    payload.favicon,
                    &mut self.registry,
                    max_age,
                );
                if !payload.from_cache {
                    summary.new_items += added;
                }
            }
            TaskOutcome::NotCached | TaskOutcome::Cancelled => {}
            TaskOutcome::Failed(err) => {
                tracing::warn!("feed `{}` failed: {err}", report.requested_url);
                summary.errors.push(err.to_string());
                summary.problematic_feeds.push(report.requested_url);
            }
        }
    }

    /// Subscribe to a new feed and sync it immediately. Returns `Ok(false)`
    /// without fetching when the URL is already subscribed; on a fetch or
    /// parse failure the subscription is rolled back.
    pub async fn add_feed(&mut self, url: &str) -> Result<bool> {
        let url = ensure_scheme(url);
        if self.registry.contains(&url) {
            return Ok(false);
        }
        self.registry.insert(&url, FeedEntry::default());

        let max_age = self.config.max_article_age();
        let ctx = self.task_context();
        let report = pipeline::sync_feed(&ctx, FetchTask::new(url.clone(), None, false)).await;

        match report.outcome {
            TaskOutcome::Synced(payload) => {
                let payload = *payload;
                if payload.canonical_url != url {
                    self.registry.rename(&url, &payload.canonical_url);
                }
                if !payload.not_modified {
                    self.registry
                        .set_last_modified(&payload.canonical_url, payload.last_modified.clone());
                }
                self.store
                    .merge_feed(payload.parsed, payload.favicon, &mut self.registry, max_age);
                self.registry.save()?;
                Ok(true)
            }
            TaskOutcome::Failed(err) => {
                self.registry.remove(&url);
                Err(err)
            }
            TaskOutcome::NotCached | TaskOutcome::Cancelled => {
                self.registry.remove(&url);
                Ok(false)
            }
        }
    }

    pub fn delete_feeds(&mut self, urls: &[String]) -> Result<()> {
        for url in urls {
            self.registry.remove(url);
            self.store.remove_feed(url);
        }
        self.registry.save()
    }

    pub fn set_read(&mut self, uid: &str, read: bool) -> bool {
        let changed = self.store.set_read(uid, read, &mut self.registry);
        if changed {
            if let Err(e) = self.registry.save() {
                tracing::error!("failed to save read state: {e}");
            }
        }
        changed
    }

    pub fn add_tag(&mut self, tag: &str, feed_urls: &[String]) -> Result<()> {
        self.registry.add_tag(tag, feed_urls);
        for url in feed_urls {
            let tags = self.registry.tags_for(url);
            self.store.retag_feed(url, tags);
        }
        self.registry.save()
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        self.registry.remove_tag(tag);
        for url in self.registry.feed_urls() {
            let tags = self.registry.tags_for(&url);
            self.store.retag_feed(&url, tags);
        }
        self.store.drop_tag(tag);
        self.registry.save()
    }

    /// Find an article's thumbnail URL, probing its page for `og:image`
    /// on first use and remembering the answer.
    pub async fn resolve_thumbnail(&mut self, uid: &str) -> Option<String> {
        let (identifier, link, existing) = {
            let article = self.store.get_article(uid)?;
            (
                article.identifier.clone(),
                article.link.clone(),
                article.image_url.clone(),
            )
        };
        if existing.is_some() {
            return existing;
        }

        let found = match self.thumbs.get(&identifier) {
            Some(url) => Some(url.to_string()),
            None => {
                let url = thumb::get_thumb(&self.web, &link?).await?;
                self.thumbs.set(&identifier, &url);
                if let Err(e) = self.thumbs.save() {
                    tracing::debug!("thumbnail map save failed: {e}");
                }
                Some(url)
            }
        };

        if let Some(url) = &found {
            if let Some(slot) = self.store.article_image_mut(uid) {
                *slot = Some(url.clone());
            }
        }
        found
    }

    /// Flag any in-flight cycle for cancellation and persist state. Read
    /// identifiers no longer backed by a live article are pruned here,
    /// not on every cycle.
    pub fn shutdown(&mut self) -> Result<()> {
        self.cancel.store(true, Ordering::SeqCst);
        let live = self.store.live_identifiers();
        self.registry.prune_read_items(|id| live.contains(id));
        self.registry.save()?;
        self.thumbs.save()?;
        Ok(())
    }

    fn task_context(&self) -> TaskContext {
        TaskContext {
            fetcher: Arc::clone(&self.fetcher),
            web: Arc::clone(&self.web),
            cache: self.cache.clone(),
            cancel: Arc::clone(&self.cancel),
        }
    }
}

fn ensure_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.cache_dir = Some(dir.path().join("cache"));
        config.storage.data_dir = Some(dir.path().join("data"));
        // Unreachable probe host forces offline mode.
        config.network.probe_url = "http://127.0.0.1:1/".to_string();
        config.refresh.request_timeout_secs = 1;
        config
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("example.com/feed"), "http://example.com/feed");
        assert_eq!(
            ensure_scheme("https://example.com/feed"),
            "https://example.com/feed"
        );
    }

    #[tokio::test]
    async fn test_offline_refresh_emits_full_event_sequence() {
        let dir = TempDir::new().unwrap();
        let mut engine = SyncEngine::new(test_config(&dir)).unwrap();
        let mut events = engine.subscribe();

        let summary = engine.refresh(RefreshReason::Manual).await;
        assert!(summary.errors.is_empty());
        assert_eq!(summary.new_items, 0);

        assert!(matches!(
            events.try_recv().unwrap(),
            RefreshEvent::RefreshStarted {
                reason: RefreshReason::Manual
            }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            RefreshEvent::OnlineChanged(false)
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            RefreshEvent::RefreshEnded { .. }
        ));
    }

    #[tokio::test]
    async fn test_startup_without_refresh_on_startup_skips_probe() {
        let dir = TempDir::new().unwrap();
        let mut engine = SyncEngine::new(test_config(&dir)).unwrap();
        let mut events = engine.subscribe();

        engine.refresh(RefreshReason::Startup).await;

        assert!(matches!(
            events.try_recv().unwrap(),
            RefreshEvent::RefreshStarted {
                reason: RefreshReason::Startup
            }
        ));
        // Cache-only pass: no connectivity verdict, straight to the end.
        assert!(matches!(
            events.try_recv().unwrap(),
            RefreshEvent::RefreshEnded { .. }
        ));
    }

    #[tokio::test]
    async fn test_add_feed_rolls_back_on_failure() {
        let dir = TempDir::new().unwrap();
        let mut engine = SyncEngine::new(test_config(&dir)).unwrap();

        let result = engine.add_feed("http://127.0.0.1:1/feed.xml").await;
        assert!(result.is_err());
        assert!(engine.registry().is_empty());
    }
}
