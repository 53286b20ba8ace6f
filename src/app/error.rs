use thiserror::Error;

/// Per-feed failure taxonomy. Every variant is isolated to the feed task
/// that produced it; nothing here is fatal to a refresh cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("`{0}`: connection timed out")]
    ConnectionTimeout(String),

    #[error("`{0}` might not be a valid address")]
    Transport(String),

    #[error("error downloading `{url}`, code `{code}`")]
    HttpStatus { url: String, code: u16 },

    #[error("`{0}` may not be an RSS or Atom feed")]
    NotAFeed(String),

    #[error("errors while parsing feed `{0}`")]
    ParseDecode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Classify a transport-layer error from reqwest against the URL that
    /// was being fetched.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::ConnectionTimeout(url.to_string())
        } else {
            SyncError::Transport(url.to_string())
        }
    }

    /// Whether this failure should trigger the one-shot HTML autodiscovery
    /// fallback (the document was reachable but is not a usable feed).
    pub fn wants_autodiscovery(&self) -> bool {
        matches!(self, SyncError::NotAFeed(_) | SyncError::ParseDecode(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
