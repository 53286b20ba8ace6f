use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::cli::{commands, Cli, Commands};
use freshet::config::Config;
use freshet::engine::SyncEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let mut engine = SyncEngine::new(config)?;

    match cli.command {
        Commands::Add { url } => {
            commands::add_feed(&mut engine, &url).await?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&mut engine, &url).await?;
        }
        Commands::Refresh => {
            commands::refresh(&mut engine).await?;
        }
        Commands::List { items } => {
            commands::list(&mut engine, items).await?;
        }
        Commands::Run => {
            commands::run(engine).await?;
        }
    }

    Ok(())
}
