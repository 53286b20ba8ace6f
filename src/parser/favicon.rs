//! Favicon resolution for a parsed feed.
//!
//! Resolution order: reuse an already-cached icon, then the feed's own
//! declared image, then an icon link probed from the site's HTML, then
//! the same probe against the first item's link. Every step may fail
//! silently; a feed without a favicon is not an error.

use std::path::PathBuf;

use scraper::{Html, Selector};
use url::Url;

use crate::fetcher::{CacheLayout, HttpFetcher};
use crate::parser::ParsedFeed;

/// Resolve a favicon file for `parsed`, or `None`. With `offline` set,
/// only the cached-icon step runs.
pub async fn resolve(
    web: &HttpFetcher,
    cache: &CacheLayout,
    parsed: &ParsedFeed,
    offline: bool,
) -> Option<PathBuf> {
    let dest = cache.favicon_path(&parsed.rss_link);
    if dest.exists() {
        return Some(dest);
    }
    if offline {
        return None;
    }

    if let Some(image_url) = &parsed.image_url {
        if web.download_raw(image_url, &dest).await.is_ok() {
            return Some(dest);
        }
        tracing::debug!(
            "invalid image url for feed `{}` ({})",
            parsed.rss_link,
            image_url
        );
    }

    let first_item_link = parsed.entries.first().and_then(|e| e.link.clone());
    for candidate in [Some(parsed.link.clone()), first_item_link]
        .into_iter()
        .flatten()
        .filter(|l| !l.is_empty())
    {
        if probe_site_icon(web, &candidate, &dest).await {
            return Some(dest);
        }
    }

    tracing::debug!("no favicon for feed `{}`", parsed.rss_link);
    None
}

/// Probe one HTML page for a declared icon and download it to `dest`.
async fn probe_site_icon(web: &HttpFetcher, page_url: &str, dest: &PathBuf) -> bool {
    let Ok(page) = web.cached_page(page_url).await else {
        return false;
    };
    let Ok(html) = tokio::fs::read(&page).await else {
        return false;
    };
    let Some(icon_url) = extract_icon_url(&String::from_utf8_lossy(&html), page_url) else {
        return false;
    };
    web.download_raw(&icon_url, dest).await.is_ok()
}

/// First `<link rel~="icon">` href, absolutized against the page URL.
pub fn extract_icon_url(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(r#"link[rel~="icon"], link[rel="apple-touch-icon"]"#).ok()?;

    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Ok(absolute) = Url::parse(base).and_then(|b| b.join(href)) {
                return Some(absolute.to_string());
            }
        }
    }
    None
}
