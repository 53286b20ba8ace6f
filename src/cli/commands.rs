use tokio::sync::broadcast;

use crate::app::{Result, SyncError};
use crate::engine::service::SyncService;
use crate::engine::{RefreshEvent, RefreshReason, SyncEngine};

pub async fn add_feed(engine: &mut SyncEngine, url: &str) -> Result<()> {
    if !engine.add_feed(url).await? {
        println!("Feed already exists: {}", url);
        return Ok(());
    }
    println!("Added feed: {}", url);
    let count = engine.store_mut().articles().len();
    println!("Fetched {} items", count);
    Ok(())
}

pub async fn remove_feed(engine: &mut SyncEngine, url: &str) -> Result<()> {
    if !engine.registry().contains(url) {
        println!("No such feed: {}", url);
        return Ok(());
    }
    engine.delete_feeds(&[url.to_string()])?;
    println!("Removed feed: {}", url);
    Ok(())
}

pub async fn refresh(engine: &mut SyncEngine) -> Result<()> {
    if engine.registry().is_empty() {
        println!("No feeds to refresh");
        return Ok(());
    }
    println!("Refreshing {} feeds...", engine.registry().len());

    let summary = engine.refresh(RefreshReason::Manual).await;
    for error in &summary.errors {
        eprintln!("  {}", error);
    }
    println!(
        "Refresh complete: {} new items, {} errors",
        summary.new_items,
        summary.errors.len()
    );
    Ok(())
}

pub async fn list(engine: &mut SyncEngine, items: bool) -> Result<()> {
    // Populate the collection from cached documents without going online.
    engine.refresh(RefreshReason::Startup).await;
    if items {
        list_items(engine)
    } else {
        list_feeds(engine)
    }
}

fn list_feeds(engine: &mut SyncEngine) -> Result<()> {
    let mut feeds: Vec<_> = engine.store().feeds().collect();
    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }
    feeds.sort_by(|a, b| a.display_title().cmp(b.display_title()));
    for feed in feeds {
        println!(
            "{} ({} unread)\n  {}",
            feed.display_title(),
            feed.unread_count,
            feed.rss_link
        );
    }
    Ok(())
}

fn list_items(engine: &mut SyncEngine) -> Result<()> {
    let articles = engine.store_mut().articles();
    if articles.is_empty() {
        println!("No items");
        return Ok(());
    }
    for article in articles {
        let read_marker = if article.read { " " } else { "\u{25cf}" };
        let date = article.pub_date.format("%Y-%m-%d");
        println!("{} {} {}", read_marker, date, article.display_title());
    }
    Ok(())
}

/// Run the engine as a long-lived service until Ctrl-C.
pub async fn run(engine: SyncEngine) -> Result<()> {
    let mut events = engine.subscribe();
    let (handle, join) = SyncService::spawn(engine);
    println!("Engine running; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(RefreshEvent::RefreshEnded { summary }) => {
                    println!(
                        "Refresh complete: {} new items, {} errors",
                        summary.new_items,
                        summary.errors.len()
                    );
                    for error in &summary.errors {
                        eprintln!("  {}", error);
                    }
                }
                Ok(RefreshEvent::OnlineChanged(false)) => {
                    println!("Offline; serving cached feeds");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    handle.shutdown().await?;
    join.await
        .map_err(|_| SyncError::Config("engine task panicked".to_string()))?;
    Ok(())
}
