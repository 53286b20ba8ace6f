use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::Article;

/// A subscribed source, identified by its canonical feed URL (`rss_link`).
///
/// Created the first time its URL is successfully parsed, updated in place
/// on every subsequent parse, destroyed only by explicit user deletion.
#[derive(Debug, Clone)]
pub struct Feed {
    pub rss_link: String,
    pub title: String,
    /// The feed's site link, as declared in the document.
    pub link: String,
    pub description: String,
    pub image_url: Option<String>,
    pub favicon_path: Option<PathBuf>,
    /// Tag names attached to this feed in the registry.
    pub tags: Vec<String>,
    /// Count of contained items that are unread. Kept equal to the actual
    /// item state by the store's merge and read-toggle paths.
    pub unread_count: i64,
    /// Recorded at the last successful parse; item retention ages are
    /// computed against this, not against wall-clock "now", so a paused
    /// app does not retroactively evict items it already fetched.
    pub init_time: DateTime<Utc>,
    /// Items keyed by uid (`rss_link` + item identifier).
    pub items: HashMap<String, Article>,
}

impl Feed {
    pub fn new(rss_link: String) -> Self {
        Self {
            rss_link,
            title: String::new(),
            link: String::new(),
            description: String::new(),
            image_url: None,
            favicon_path: None,
            tags: Vec::new(),
            unread_count: 0,
            init_time: Utc::now(),
            items: HashMap::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.rss_link
        } else {
            &self.title
        }
    }

    /// Actual number of unread items currently held.
    pub fn count_unread(&self) -> i64 {
        self.items.values().filter(|i| !i.read).count() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_falls_back_to_url() {
        let feed = Feed::new("https://example.com/feed.xml".into());
        assert_eq!(feed.display_title(), "https://example.com/feed.xml");
    }

    #[test]
    fn test_count_unread() {
        let mut feed = Feed::new("https://e.com/f".into());
        for (n, read) in [(1, false), (2, true), (3, false)] {
            let identifier = format!("item-{n}");
            let uid = Article::uid_for(&feed.rss_link, &identifier);
            feed.items.insert(
                uid.clone(),
                Article {
                    uid,
                    identifier,
                    feed_url: feed.rss_link.clone(),
                    title: format!("Item {n}"),
                    link: None,
                    pub_date: Utc::now(),
                    read,
                    image_url: None,
                    content: String::new(),
                    author: None,
                    author_url: None,
                },
            );
        }
        assert_eq!(feed.count_unread(), 2);
    }
}
