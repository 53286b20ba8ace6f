//! # Freshet
//!
//! A concurrent RSS/Atom feed synchronization engine.
//!
//! ## Architecture
//!
//! One refresh cycle flows through a fixed pipeline:
//!
//! ```text
//! Scheduler → Fetcher → Parser → Store
//! ```
//!
//! - [`scheduler`]: bounded worker pool, one task per subscribed feed
//! - [`fetcher`]: conditional HTTP fetching into a shared disk cache
//! - [`parser`]: feed decoding, plus HTML autodiscovery and icon probing
//! - [`store`]: the merged, filtered, sorted article collection
//!
//! All mutable state (the registry, the store, the thumbnail map) is owned
//! by a single [`engine::SyncEngine`]; workers only ever return reports.
//!
//! ## Quick Start
//!
//! ```bash
//! # Subscribe to a feed
//! freshet add https://blog.rust-lang.org/feed.xml
//!
//! # Refresh everything
//! freshet refresh
//!
//! # List articles from the cache
//! freshet list --items
//!
//! # Keep running with auto-refresh
//! freshet run
//! ```

/// Shared error taxonomy. Every [`app::SyncError`] is scoped to the one
/// feed task that produced it.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration, loaded from `~/.config/freshet/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a subscribed source and its items
/// - [`Article`](domain::Article): one entry, uniquely identified
/// - [`TagStore`](domain::TagStore): per-tag unread aggregates
pub mod domain;

/// The synchronization engine: refresh orchestration, lifecycle events,
/// the auto-refresh timer and the command-driven service front end.
pub mod engine;

/// Conditional HTTP fetching, the on-disk cache and the connectivity
/// probe.
pub mod fetcher;

/// Feed decoding, HTML feed autodiscovery, favicon and thumbnail
/// resolution.
pub mod parser;

/// The persisted subscription registry (`feeds.json`).
pub mod registry;

/// Bounded concurrent fetch scheduling.
pub mod scheduler;

/// The in-memory article collection with filtering and sorting.
pub mod store;
