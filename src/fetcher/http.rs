use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, IF_MODIFIED_SINCE, LOCATION};
use reqwest::{redirect, Client, StatusCode};
use url::Url;

use crate::app::{Result, SyncError};
use crate::fetcher::cache::{normalize_utf8, write_atomic, CacheLayout};
use crate::fetcher::{FetchOutcome, Fetcher};

pub const USER_AGENT: &str = "freshet/0.1";

/// Redirect chains longer than this are reported as transport failures.
const MAX_REDIRECTS: usize = 5;

pub struct HttpFetcher {
    client: Client,
    cache: CacheLayout,
}

impl HttpFetcher {
    /// Redirects are handled manually so permanent ones can rewrite the
    /// registry key; the client itself never follows them.
    pub fn new(cache: CacheLayout, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self { client, cache }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cache(&self) -> &CacheLayout {
        &self.cache
    }

    async fn send(&self, url: &str, headers: HeaderMap) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(url, e))
    }

    /// GET a resource straight to `dest`, following redirects silently.
    /// Used for favicons, thumbnails and probed HTML pages.
    pub async fn download_raw(&self, url: &str, dest: &Path) -> Result<()> {
        let mut current = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let res = self.send(&current, HeaderMap::new()).await?;
            if res.status().is_redirection() {
                current = redirect_target(&current, &res)?;
                continue;
            }
            if !res.status().is_success() {
                return Err(SyncError::HttpStatus {
                    url: current,
                    code: res.status().as_u16(),
                });
            }
            let body = res
                .bytes()
                .await
                .map_err(|e| SyncError::from_reqwest(&current, e))?;
            write_atomic(dest, &body)?;
            return Ok(());
        }
        Err(SyncError::Transport(url.to_string()))
    }

    /// Fetch an HTML page into the cache, reusing an existing copy.
    pub async fn cached_page(&self, url: &str) -> Result<PathBuf> {
        let dest = self.cache.page_path(url);
        if !dest.exists() {
            self.download_raw(url, &dest).await?;
        }
        Ok(dest)
    }
}

fn redirect_target(current: &str, res: &reqwest::Response) -> Result<String> {
    let location = res
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SyncError::Transport(current.to_string()))?;
    absolutize(current, location)
}

fn absolutize(base: &str, location: &str) -> Result<String> {
    Ok(Url::parse(base)?.join(location)?.to_string())
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<&str>,
        cache_only: bool,
    ) -> Result<FetchOutcome> {
        let dest = self.cache.feed_path(url);

        if cache_only {
            return Ok(if dest.exists() {
                FetchOutcome::Cached { path: dest }
            } else {
                FetchOutcome::NotCached
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        // Only ask for a 304 when we actually still hold the cached copy.
        if let Some(token) = last_modified {
            if dest.exists() {
                if let Ok(value) = HeaderValue::from_str(token) {
                    headers.insert(IF_MODIFIED_SINCE, value);
                }
            }
        }

        let mut current = url.to_string();
        let mut canonical = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let res = self.send(&current, headers.clone()).await?;
            let status = res.status();

            if status == StatusCode::NOT_MODIFIED {
                let path = self.cache.feed_path(&canonical);
                let path = if path.exists() { path } else { dest.clone() };
                return Ok(FetchOutcome::Cached { path });
            }

            if status.is_redirection() {
                current = redirect_target(&current, &res)?;
                // Permanent moves rename the subscription; temporary ones
                // (303/307) are followed without touching the canonical URL.
                if matches!(status.as_u16(), 301 | 302 | 308) {
                    canonical = current.clone();
                }
                continue;
            }

            if status.is_success() {
                let token = res
                    .headers()
                    .get("last-modified")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                let body = res
                    .bytes()
                    .await
                    .map_err(|e| SyncError::from_reqwest(&current, e))?;
                let body = normalize_utf8(body.to_vec());
                let path = self.cache.feed_path(&canonical);
                write_atomic(&path, &body)?;
                return Ok(FetchOutcome::Fetched {
                    path,
                    canonical_url: canonical,
                    last_modified: token,
                });
            }

            return Err(SyncError::HttpStatus {
                url: current,
                code: status.as_u16(),
            });
        }

        Err(SyncError::Transport(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fetcher_in(dir: &TempDir) -> HttpFetcher {
        let cache = CacheLayout::new(dir.path()).unwrap();
        HttpFetcher::new(cache, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_cache_only_miss_makes_no_network_call() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher_in(&dir);
        // No server exists; cache-only must still answer immediately.
        let outcome = fetcher
            .fetch("http://127.0.0.1:1/feed.xml", None, true)
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::NotCached));
    }

    #[tokio::test]
    async fn test_cache_only_hit_returns_cached_path() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher_in(&dir);
        let url = "http://127.0.0.1:1/feed.xml";
        let path = fetcher.cache().feed_path(url);
        write_atomic(&path, b"<rss/>").unwrap();

        match fetcher.fetch(url, None, true).await.unwrap() {
            FetchOutcome::Cached { path: p } => assert_eq!(p, path),
            other => panic!("expected cached outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_absolutize_relative_location() {
        assert_eq!(
            absolutize("https://example.com/a/feed.xml", "/b/feed.xml").unwrap(),
            "https://example.com/b/feed.xml"
        );
        assert_eq!(
            absolutize("https://example.com/a/", "https://other.example/f").unwrap(),
            "https://other.example/f"
        );
    }
}
