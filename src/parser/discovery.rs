//! HTML feed-link autodiscovery.
//!
//! When a subscribed URL turns out not to be a feed document, its HTML is
//! probed for a declared `<link rel="alternate">` pointing at an RSS/Atom
//! resource. The probe page goes through the shared cache like any other
//! resource.

use scraper::{Html, Selector};
use url::Url;

use crate::fetcher::HttpFetcher;

const FEED_TYPES: [&str; 3] = [
    "application/rss+xml",
    "application/atom+xml",
    "application/feed+json",
];

/// Fetch `url` as an HTML page and return the first declared feed link,
/// absolutized against the page URL. `None` when the page is unreachable
/// or declares no feed.
pub async fn discover(web: &HttpFetcher, url: &str) -> Option<String> {
    let page = web.cached_page(url).await.ok()?;
    let html = tokio::fs::read(&page).await.ok()?;
    extract_feed_link(&String::from_utf8_lossy(&html), url)
}

/// Pure extraction half, separated so it can run without a network.
pub fn extract_feed_link(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"link[rel="alternate"]"#).ok()?;

    for element in document.select(&selector) {
        let Some(media_type) = element.value().attr("type") else {
            continue;
        };
        if !FEED_TYPES.contains(&media_type) {
            continue;
        }
        if let Some(href) = element.value().attr("href") {
            if let Ok(absolute) = Url::parse(base).and_then(|b| b.join(href)) {
                return Some(absolute.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_relative_feed_link() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <link rel="alternate" type="application/rss+xml" href="/feed.xml">
        </head><body></body></html>"#;
        assert_eq!(
            extract_feed_link(html, "https://blog.example/"),
            Some("https://blog.example/feed.xml".to_string())
        );
    }

    #[test]
    fn test_extracts_absolute_atom_link() {
        let html = r#"<link rel="alternate" type="application/atom+xml"
            href="https://cdn.example/atom">"#;
        assert_eq!(
            extract_feed_link(html, "https://blog.example/post"),
            Some("https://cdn.example/atom".to_string())
        );
    }

    #[test]
    fn test_ignores_non_feed_alternates() {
        let html = r#"<link rel="alternate" type="text/html" href="/en/">"#;
        assert_eq!(extract_feed_link(html, "https://blog.example/"), None);
    }

    #[test]
    fn test_none_on_plain_page() {
        assert_eq!(
            extract_feed_link("<html><body>hi</body></html>", "https://e.com/"),
            None
        );
    }
}
