pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet")]
#[command(about = "An RSS/Atom feed synchronization engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to a new feed
    Add {
        /// URL of the feed (or of a page declaring one)
        url: String,
    },
    /// Unsubscribe from a feed
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// Refresh all subscribed feeds
    Refresh,
    /// List feeds or articles
    List {
        /// Show articles instead of feeds
        #[arg(long)]
        items: bool,
    },
    /// Keep the engine running with auto-refresh until interrupted
    Run,
}
