//! Content-addressed on-disk cache.
//!
//! One file per resource, keyed by the SHA-256 of its source URL: feed
//! documents as `<hash>.rss`, probed HTML pages as `<hash>.html`, favicons
//! under a `thumbs/` sibling directory. The cache directory is shared
//! across workers; all writes go through [`write_atomic`] so a concurrent
//! reader never observes a half-written file.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a URL, used as the cache file stem.
pub fn shasum(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Replace `path` with `bytes` via write-then-rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("part");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Normalize fetched text to UTF-8. Valid UTF-8 passes through untouched;
/// anything else is converted lossily so downstream decoding never trips
/// on stray bytes.
pub fn normalize_utf8(bytes: Vec<u8>) -> Vec<u8> {
    match String::from_utf8(bytes) {
        Ok(s) => s.into_bytes(),
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned().into_bytes(),
    }
}

#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("thumbs"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached feed document for a feed URL.
    pub fn feed_path(&self, url: &str) -> PathBuf {
        self.root.join(format!("{}.rss", shasum(url)))
    }

    /// Cached HTML page (autodiscovery and favicon probing).
    pub fn page_path(&self, url: &str) -> PathBuf {
        self.root.join(format!("{}.html", shasum(url)))
    }

    /// Favicon image keyed by the feed's canonical URL.
    pub fn favicon_path(&self, rss_link: &str) -> PathBuf {
        self.root.join("thumbs").join(format!("{}.png", shasum(rss_link)))
    }
}
