//! Article thumbnail resolution.
//!
//! Feeds often omit item images; the article's own page usually declares
//! one via `og:image`. Resolved URLs are remembered in a small JSON map
//! keyed by article identifier so a page is only probed once.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use scraper::{Html, Selector};

use crate::app::Result;
use crate::fetcher::HttpFetcher;

/// Persisted identifier → thumbnail-URL map.
#[derive(Debug, Default)]
pub struct ThumbCache {
    path: PathBuf,
    map: BTreeMap<String, String>,
}

impl ThumbCache {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, map })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.map)
            .map_err(|e| crate::app::SyncError::Config(format!("thumb map encode: {e}")))?;
        let tmp = self.path.with_extension("json.part");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.map.get(identifier).map(String::as_str)
    }

    pub fn set(&mut self, identifier: &str, url: &str) {
        self.map.insert(identifier.to_string(), url.to_string());
    }
}

/// Probe an article's page for its `og:image`. Fails silently to `None`.
pub async fn get_thumb(web: &HttpFetcher, page_url: &str) -> Option<String> {
    let page = web.cached_page(page_url).await.ok()?;
    let html = tokio::fs::read(&page).await.ok()?;
    extract_og_image(&String::from_utf8_lossy(&html))
}

pub fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_og_image() {
        let html = r#"<head>
            <meta property="og:title" content="A post">
            <meta property="og:image" content="https://img.example/cover.jpg">
        </head>"#;
        assert_eq!(
            extract_og_image(html),
            Some("https://img.example/cover.jpg".to_string())
        );
    }

    #[test]
    fn test_extract_og_image_missing() {
        assert_eq!(extract_og_image("<html></html>"), None);
    }

    #[test]
    fn test_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thumbnails.json");
        let mut cache = ThumbCache::load(&path).unwrap();
        cache.set("https://e.com/a", "https://img.example/a.jpg");
        cache.save().unwrap();

        let cache2 = ThumbCache::load(&path).unwrap();
        assert_eq!(
            cache2.get("https://e.com/a"),
            Some("https://img.example/a.jpg")
        );
    }
}
