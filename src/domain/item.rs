use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry within a feed.
///
/// `identifier` is the item's own link, or a title+publish-date fallback
/// when no link exists, so it stays stable across re-parses of an
/// unchanged document. `uid` prefixes the identifier with the owning
/// feed's URL and is unique across the whole article collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub uid: String,
    pub identifier: String,
    /// Owning feed's canonical URL (non-owning back-reference).
    pub feed_url: String,
    pub title: String,
    pub link: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub read: bool,
    pub image_url: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub author_url: Option<String>,
}

impl Article {
    /// Collection-wide unique id for an item of a given feed.
    pub fn uid_for(feed_url: &str, identifier: &str) -> String {
        format!("{}{}", feed_url, identifier)
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Article {
        Article {
            uid: Article::uid_for("https://example.com/feed", "https://example.com/a"),
            identifier: "https://example.com/a".into(),
            feed_url: "https://example.com/feed".into(),
            title: "Hello".into(),
            link: Some("https://example.com/a".into()),
            pub_date: Utc::now(),
            read: false,
            image_url: None,
            content: String::new(),
            author: None,
            author_url: None,
        }
    }

    #[test]
    fn test_uid_is_feed_plus_identifier() {
        let a = sample();
        assert_eq!(a.uid, "https://example.com/feedhttps://example.com/a");
    }

    #[test]
    fn test_uid_stable_across_calls() {
        assert_eq!(
            Article::uid_for("https://e.com/f", "id-1"),
            Article::uid_for("https://e.com/f", "id-1")
        );
        assert_ne!(
            Article::uid_for("https://e.com/f", "id-1"),
            Article::uid_for("https://e.com/g", "id-1")
        );
    }

    #[test]
    fn test_display_title_fallback() {
        let mut a = sample();
        a.title = String::new();
        assert_eq!(a.display_title(), "(Untitled)");
    }
}
