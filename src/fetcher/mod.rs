pub mod cache;
pub mod connectivity;
pub mod http;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::app::Result;

pub use cache::CacheLayout;
pub use http::HttpFetcher;

/// Outcome of one conditional fetch of a feed URL.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Cache-only mode was requested and no cached file exists; no network
    /// call was made.
    NotCached,
    /// The cached copy is current (HTTP 304, or a cache-only hit). The
    /// file's bytes are untouched.
    Cached { path: PathBuf },
    /// Fresh content persisted to the cache. `canonical_url` reflects any
    /// permanent redirects followed; `last_modified` echoes the response
    /// header, `None` meaning the stored token must be cleared.
    Fetched {
        path: PathBuf,
        canonical_url: String,
        last_modified: Option<String>,
    },
}

#[async_trait]
pub trait Fetcher {
    /// Conditionally fetch one feed/resource URL into the shared cache.
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<&str>,
        cache_only: bool,
    ) -> Result<FetchOutcome>;
}
