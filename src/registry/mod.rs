//! Persisted map of subscribed URLs to per-feed metadata.
//!
//! Backed by a small JSON document (`feeds.json` in the data directory)
//! that survives process restarts:
//!
//! ```json
//! {
//!   "feeds": { "<url>": { "tags": ["news"], "last_modified": "..." } },
//!   "read_items": ["<identifier>", ...],
//!   "tags": ["news", ...]
//! }
//! ```
//!
//! The registry is owned by the refresh orchestrator's task; workers never
//! touch it. Redirect rewrites move an entry to a new key while keeping
//! its payload.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::Result;

/// Per-feed persisted metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub tags: Vec<String>,
    /// Caching token sent back as `If-Modified-Since`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    feeds: BTreeMap<String, FeedEntry>,
    #[serde(default)]
    read_items: BTreeSet<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug)]
pub struct FeedRegistry {
    path: PathBuf,
    data: RegistryData,
}

impl FeedRegistry {
    /// Load the registry from `path`, starting empty when the file does
    /// not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| crate::app::SyncError::Config(format!("bad registry file: {e}")))?
        } else {
            RegistryData::default()
        };
        Ok(Self { path, data })
    }

    /// Persist atomically: a concurrent reader never sees a partial file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.data)
            .map_err(|e| crate::app::SyncError::Config(format!("registry encode: {e}")))?;
        let tmp = self.path.with_extension("json.part");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.data.feeds.contains_key(url)
    }

    pub fn insert(&mut self, url: &str, entry: FeedEntry) {
        self.data.feeds.insert(url.to_string(), entry);
    }

    pub fn remove(&mut self, url: &str) -> Option<FeedEntry> {
        self.data.feeds.remove(url)
    }

    /// Move an entry under a new key, keeping its tags and caching token.
    /// Used when a feed server issues a permanent redirect.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(entry) = self.data.feeds.remove(old) {
            self.data.feeds.insert(new.to_string(), entry);
        }
    }

    pub fn feed_urls(&self) -> Vec<String> {
        self.data.feeds.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.feeds.is_empty()
    }

    pub fn last_modified(&self, url: &str) -> Option<String> {
        self.data
            .feeds
            .get(url)
            .and_then(|e| e.last_modified.clone())
    }

    /// Update the stored caching token; `None` clears it (a 200 response
    /// without a `Last-Modified` header).
    pub fn set_last_modified(&mut self, url: &str, token: Option<String>) {
        if let Some(entry) = self.data.feeds.get_mut(url) {
            entry.last_modified = token;
        }
    }

    pub fn tags_for(&self, url: &str) -> Vec<String> {
        self.data
            .feeds
            .get(url)
            .map(|e| e.tags.clone())
            .unwrap_or_default()
    }

    pub fn all_tags(&self) -> &[String] {
        &self.data.tags
    }

    /// Attach a tag to the given feeds, registering the tag name if new.
    /// Tag names are deduplicated case-insensitively.
    pub fn add_tag(&mut self, tag: &str, feed_urls: &[String]) {
        let known = self
            .data
            .tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag));
        if !known {
            self.data.tags.push(tag.to_string());
        }
        for url in feed_urls {
            if let Some(entry) = self.data.feeds.get_mut(url) {
                if !entry.tags.iter().any(|t| t == tag) {
                    entry.tags.push(tag.to_string());
                }
            }
        }
    }

    /// Remove a tag everywhere.
    pub fn remove_tag(&mut self, tag: &str) {
        self.data.tags.retain(|t| t != tag);
        for entry in self.data.feeds.values_mut() {
            entry.tags.retain(|t| t != tag);
        }
    }

    pub fn is_read(&self, identifier: &str) -> bool {
        self.data.read_items.contains(identifier)
    }

    pub fn mark_read(&mut self, identifier: &str, read: bool) {
        if read {
            self.data.read_items.insert(identifier.to_string());
        } else {
            self.data.read_items.remove(identifier);
        }
    }

    /// Drop read identifiers that no longer appear in any live feed.
    /// Called lazily at teardown, not on every cycle.
    pub fn prune_read_items<F>(&mut self, is_live: F)
    where
        F: Fn(&str) -> bool,
    {
        self.data.read_items.retain(|id| is_live(id));
    }
}
