//! Configuration management.
//!
//! Configuration is read from `~/.config/freshet/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. The loaded [`Config`] is constructed once and passed by
//! reference into every component that needs it; refresh-related values
//! are consumed at the start of each refresh cycle, so edits take effect
//! on the next cycle, not mid-cycle.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,
    pub view: ViewConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
}

/// Refresh scheduling knobs, read once per cycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Upper bound on concurrently running feed tasks.
    pub max_refresh_threads: usize,
    /// Articles older than this are evicted from the in-memory store.
    pub max_article_age_days: i64,
    pub auto_refresh_enabled: bool,
    pub auto_refresh_secs: u64,
    /// When false, the startup pass only loads cached feed documents.
    pub refresh_on_startup: bool,
    pub request_timeout_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_refresh_threads: 2,
            max_article_age_days: 30,
            auto_refresh_enabled: true,
            auto_refresh_secs: 300,
            refresh_on_startup: false,
            request_timeout_secs: 30,
        }
    }
}

/// Initial state of the article view filters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub new_first: bool,
    pub show_read_items: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            new_first: true,
            show_read_items: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host probed with a HEAD request to decide online/offline mode.
    pub probe_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://gnome.org".to_string(),
        }
    }
}

/// Optional overrides for the cache and data directories.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/freshet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("freshet").join("config.toml"))
    }

    /// Directory holding cached feed documents, probed pages and favicons.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage.cache_dir {
            return Ok(dir.clone());
        }
        let dir = dirs::cache_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("freshet"))
    }

    /// Directory holding the persisted feed registry and thumbnail map.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        let dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("freshet"))
    }

    /// Retention window for articles.
    pub fn max_article_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh.max_article_age_days)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.request_timeout_secs)
    }

    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.auto_refresh_secs)
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Freshet configuration

[refresh]
# Maximum number of feeds fetched concurrently
max_refresh_threads = 2

# Articles older than this many days are dropped from the collection
max_article_age_days = 30

# Recurring background refresh
auto_refresh_enabled = true
auto_refresh_secs = 300

# When false, startup only loads feed documents already in the cache
refresh_on_startup = false

# Per-request HTTP timeout in seconds
request_timeout_secs = 30

[view]
# Sort articles newest-first
new_first = true

# Show articles already marked as read
show_read_items = true

[network]
# Host probed to decide whether the machine is online
probe_url = "https://gnome.org"

[storage]
# Uncomment to override the default locations
# cache_dir = "/path/to/cache"
# data_dir = "/path/to/data"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
