//! The live article collection.
//!
//! A derived, always-consistent view over the union of all feeds' items.
//! Not a source of truth: entries are added or removed only in response
//! to feed merges and evictions, and only by the owning task. Filtering
//! and sorting are recomputed lazily whenever a relevant setting or the
//! underlying data changes.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Article, Feed, TagStore};
use crate::parser::ParsedFeed;
use crate::registry::FeedRegistry;

#[derive(Debug, Default)]
pub struct ArticleStore {
    feeds: HashMap<String, Feed>,
    tags: TagStore,
    selected_feeds: Vec<String>,
    search_term: String,
    show_read: bool,
    new_first: bool,
    open_article: Option<String>,
    view: Vec<(String, String)>,
    view_stale: bool,
}

impl ArticleStore {
    pub fn new(show_read: bool, new_first: bool) -> Self {
        Self {
            show_read,
            new_first,
            view_stale: true,
            ..Self::default()
        }
    }

    /// Merge one parse result into the collection.
    ///
    /// Per entry: compute the uid and its age relative to the feed's
    /// `init_time` at this parse. Known items past the retention window
    /// are removed (their read mark dropped from the registry); unknown
    /// items within the window are inserted. The feed's unread count is
    /// recomputed once at the end so tag aggregates move exactly once.
    ///
    /// Returns the number of newly inserted items.
    pub fn merge_feed(
        &mut self,
        parsed: ParsedFeed,
        favicon: Option<PathBuf>,
        registry: &mut FeedRegistry,
        max_age: Duration,
    ) -> usize {
        let rss_link = parsed.rss_link.clone();
        let tags = registry.tags_for(&rss_link);
        for tag in &tags {
            self.tags.ensure(tag);
        }

        let feed = self
            .feeds
            .entry(rss_link.clone())
            .or_insert_with(|| Feed::new(rss_link));
        feed.title = parsed.title;
        feed.link = parsed.link;
        feed.description = parsed.description;
        if parsed.image_url.is_some() {
            feed.image_url = parsed.image_url;
        }
        if favicon.is_some() {
            feed.favicon_path = favicon;
        }
        feed.tags = tags;
        feed.init_time = Utc::now();

        let mut added = 0;
        for entry in parsed.entries {
            let uid = Article::uid_for(&feed.rss_link, &entry.identifier);
            let age = feed.init_time - entry.pub_date;
            let valid_age = age <= max_age;

            if feed.items.contains_key(&uid) {
                if !valid_age {
                    if let Some(old) = feed.items.remove(&uid) {
                        if old.read {
                            registry.mark_read(&old.identifier, false);
                        }
                    }
                }
            } else if valid_age {
                let read = registry.is_read(&entry.identifier);
                feed.items.insert(
                    uid.clone(),
                    Article {
                        uid,
                        identifier: entry.identifier,
                        feed_url: feed.rss_link.clone(),
                        title: entry.title,
                        link: entry.link,
                        pub_date: entry.pub_date,
                        read,
                        image_url: entry.image_url,
                        content: entry.content,
                        author: entry.author,
                        author_url: entry.author_url,
                    },
                );
                added += 1;
            } else if registry.is_read(&entry.identifier) {
                // Out-of-window entries leave no stale read marks behind.
                registry.mark_read(&entry.identifier, false);
            }
        }

        let unread = feed.count_unread();
        let delta = unread - feed.unread_count;
        feed.unread_count = unread;
        let feed_tags = feed.tags.clone();
        if delta != 0 {
            for tag in &feed_tags {
                self.tags.increment(tag, delta);
            }
        }

        self.view_stale = true;
        added
    }

    /// Drop every item older than the retention window, measured against
    /// `now` (end-of-cycle pruning across all feeds).
    pub fn evict_older_than(
        &mut self,
        max_age: Duration,
        now: DateTime<Utc>,
        registry: &mut FeedRegistry,
    ) {
        let mut tag_deltas: Vec<(String, i64)> = Vec::new();

        for feed in self.feeds.values_mut() {
            let stale: Vec<String> = feed
                .items
                .iter()
                .filter(|(_, item)| now - item.pub_date > max_age)
                .map(|(uid, _)| uid.clone())
                .collect();
            if stale.is_empty() {
                continue;
            }
            for uid in stale {
                if let Some(item) = feed.items.remove(&uid) {
                    if item.read {
                        registry.mark_read(&item.identifier, false);
                    }
                }
            }
            let unread = feed.count_unread();
            let delta = unread - feed.unread_count;
            if delta != 0 {
                feed.unread_count = unread;
                for tag in &feed.tags {
                    tag_deltas.push((tag.clone(), delta));
                }
            }
            self.view_stale = true;
        }

        for (tag, delta) in tag_deltas {
            self.tags.increment(&tag, delta);
        }
    }

    /// Explicit user deletion: cascades into the item view and the
    /// selected-feeds filter.
    pub fn remove_feed(&mut self, url: &str) -> bool {
        let Some(feed) = self.feeds.remove(url) else {
            return false;
        };
        if feed.unread_count != 0 {
            for tag in &feed.tags {
                self.tags.increment(tag, -feed.unread_count);
            }
        }
        self.selected_feeds.retain(|u| u != url);
        self.view_stale = true;
        true
    }

    /// Flip one item's read flag. The parent feed's unread count moves by
    /// exactly one, and every tag the feed carries moves by the same
    /// delta. Returns false when the item was not found or already in the
    /// requested state.
    pub fn set_read(&mut self, uid: &str, read: bool, registry: &mut FeedRegistry) -> bool {
        let Some(feed_url) = self
            .feeds
            .values()
            .find(|f| f.items.contains_key(uid))
            .map(|f| f.rss_link.clone())
        else {
            return false;
        };

        let feed = self.feeds.get_mut(&feed_url).expect("feed just located");
        let item = feed.items.get_mut(uid).expect("item just located");
        if item.read == read {
            return false;
        }
        item.read = read;
        registry.mark_read(&item.identifier, read);

        let delta = if read { -1 } else { 1 };
        feed.unread_count += delta;
        let tags = feed.tags.clone();
        for tag in &tags {
            self.tags.increment(tag, delta);
        }
        self.view_stale = true;
        true
    }

    /// Apply a read state to everything currently passing the filter.
    pub fn set_all_read(&mut self, read: bool, registry: &mut FeedRegistry) {
        let uids: Vec<String> = self
            .articles()
            .into_iter()
            .map(|a| a.uid.clone())
            .collect();
        for uid in uids {
            self.set_read(&uid, read, registry);
        }
    }

    /// Replace a feed's tag set, moving its unread count out of the old
    /// tags and into the new ones.
    pub fn retag_feed(&mut self, url: &str, tags: Vec<String>) {
        let Some(feed) = self.feeds.get_mut(url) else {
            return;
        };
        let unread = feed.unread_count;
        let old = std::mem::replace(&mut feed.tags, tags.clone());
        for tag in &old {
            self.tags.increment(tag, -unread);
        }
        for tag in &tags {
            self.tags.ensure(tag);
            self.tags.increment(tag, unread);
        }
    }

    /// Forget a tag's aggregate entirely (the tag was deleted).
    pub fn drop_tag(&mut self, tag: &str) {
        self.tags.remove(tag);
    }

    pub fn set_selected_feeds(&mut self, urls: Vec<String>) {
        self.selected_feeds = urls;
        self.invalidate_filter();
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.trim().to_lowercase();
        self.invalidate_filter();
    }

    pub fn set_show_read(&mut self, show: bool) {
        self.show_read = show;
        self.invalidate_filter();
    }

    pub fn set_new_first(&mut self, new_first: bool) {
        self.new_first = new_first;
        self.invalidate_sort();
    }

    /// The currently open article stays visible even when read items are
    /// filtered out.
    pub fn set_open_article(&mut self, uid: Option<String>) {
        self.open_article = uid;
        self.invalidate_filter();
    }

    pub fn invalidate_filter(&mut self) {
        self.view_stale = true;
    }

    pub fn invalidate_sort(&mut self) {
        self.view_stale = true;
    }

    /// The filtered, sorted article view.
    pub fn articles(&mut self) -> Vec<&Article> {
        if self.view_stale {
            self.rebuild_view();
        }
        self.view
            .iter()
            .filter_map(|(feed_url, uid)| {
                self.feeds
                    .get(feed_url)
                    .and_then(|feed| feed.items.get(uid))
            })
            .collect()
    }

    pub fn feeds(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.values()
    }

    pub fn feed(&self, url: &str) -> Option<&Feed> {
        self.feeds.get(url)
    }

    pub fn get_article(&self, uid: &str) -> Option<&Article> {
        self.feeds.values().find_map(|f| f.items.get(uid))
    }

    pub fn article_image_mut(&mut self, uid: &str) -> Option<&mut Option<String>> {
        self.feeds
            .values_mut()
            .find_map(|f| f.items.get_mut(uid))
            .map(|a| &mut a.image_url)
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    /// Identifiers of every live item, for lazy read-set cleanup.
    pub fn live_identifiers(&self) -> std::collections::HashSet<String> {
        self.feeds
            .values()
            .flat_map(|f| f.items.values().map(|a| a.identifier.clone()))
            .collect()
    }

    fn passes(&self, item: &Article) -> bool {
        let feed_selected =
            self.selected_feeds.is_empty() || self.selected_feeds.contains(&item.feed_url);
        let read_visible = self.show_read
            || !item.read
            || self.open_article.as_deref() == Some(item.uid.as_str());
        let search_hit = self.search_term.is_empty()
            || item.title.to_lowercase().contains(&self.search_term);
        feed_selected && read_visible && search_hit
    }

    fn rebuild_view(&mut self) {
        let mut rows: Vec<(DateTime<Utc>, String, String)> = self
            .feeds
            .values()
            .flat_map(|f| f.items.values())
            .filter(|a| self.passes(a))
            .map(|a| (a.pub_date, a.feed_url.clone(), a.uid.clone()))
            .collect();
        // Stable tie-break on uid keeps equal-date orderings consistent.
        rows.sort_by(|x, y| {
            let ord = x.0.cmp(&y.0).then_with(|| x.2.cmp(&y.2));
            if self.new_first {
                ord.reverse()
            } else {
                ord
            }
        });
        self.view = rows.into_iter().map(|(_, f, u)| (f, u)).collect();
        self.view_stale = false;
    }
}
