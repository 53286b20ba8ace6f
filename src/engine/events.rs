//! Lifecycle events broadcast to observers.
//!
//! Subscribers get a best-effort stream: a slow consumer may miss events,
//! but the engine never blocks on one.

/// Why a refresh cycle started. Shows up in logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Manual,
    Startup,
    Auto,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshReason::Manual => "manual",
            RefreshReason::Startup => "startup",
            RefreshReason::Auto => "auto",
        }
    }
}

/// End-of-cycle accounting. `errors` holds one human-readable message per
/// failed feed; `problematic_feeds` the corresponding URLs as requested.
#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    pub errors: Vec<String>,
    pub problematic_feeds: Vec<String>,
    pub new_items: usize,
}

#[derive(Debug, Clone)]
pub enum RefreshEvent {
    RefreshStarted { reason: RefreshReason },
    /// Emitted with the probe verdict at the start of each cycle.
    OnlineChanged(bool),
    RefreshEnded { summary: RefreshSummary },
}
