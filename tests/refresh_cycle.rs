//! End-to-end refresh cycles against a mock HTTP server.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use freshet::config::Config;
use freshet::engine::{RefreshReason, SyncEngine};
use freshet::fetcher::CacheLayout;

/// Feed document whose links all stay on the mock server, so favicon
/// probing never leaves the test harness.
fn feed_doc(title: &str, site: &str, items: &[(&str, &str)]) -> String {
    // Recent enough to sit comfortably inside the retention window.
    let pub_date = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc2822();
    let items: String = items
        .iter()
        .map(|(item_title, link)| {
            format!(
                "<item><title>{item_title}</title><link>{site}{link}</link>\
                 <pubDate>{pub_date}</pubDate></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>{title}</title>
<link>{site}/site</link>
{items}
</channel></rss>"#
    )
}

fn config_for(dir: &TempDir, server: &MockServer, timeout_secs: u64) -> Config {
    let mut config = Config::default();
    config.storage.cache_dir = Some(dir.path().join("cache"));
    config.storage.data_dir = Some(dir.path().join("data"));
    config.network.probe_url = server.uri();
    config.refresh.request_timeout_secs = timeout_secs;
    config.refresh.auto_refresh_enabled = false;
    config
}

/// Pre-seed the persisted registry before the engine starts.
fn seed_registry(data_dir: &Path, feeds_json: &str) {
    fs::create_dir_all(data_dir).unwrap();
    fs::write(data_dir.join("feeds.json"), feeds_json).unwrap();
}

#[tokio::test]
async fn test_not_modified_leaves_cached_document_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Conditional requests get a 304; everything else a fresh document.
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header_exists("if-modified-since"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("last-modified", "Mon, 18 Aug 2025 00:00:00 GMT")
                .set_body_string(feed_doc(
                    "Conditional Feed",
                    &server.uri(),
                    &[("One", "/articles/1")],
                )),
        )
        .mount(&server)
        .await;

    let feed_url = format!("{}/feed.xml", server.uri());
    seed_registry(
        &dir.path().join("data"),
        &format!(r#"{{"feeds":{{"{feed_url}":{{"tags":[]}}}}}}"#),
    );

    let mut engine = SyncEngine::new(config_for(&dir, &server, 5)).unwrap();

    let first = engine.refresh(RefreshReason::Manual).await;
    assert!(first.errors.is_empty());
    assert_eq!(first.new_items, 1);
    assert_eq!(
        engine.registry().last_modified(&feed_url).as_deref(),
        Some("Mon, 18 Aug 2025 00:00:00 GMT")
    );

    let cached = CacheLayout::new(dir.path().join("cache"))
        .unwrap()
        .feed_path(&feed_url);
    let mtime_before = fs::metadata(&cached).unwrap().modified().unwrap();

    let second = engine.refresh(RefreshReason::Manual).await;
    assert!(second.errors.is_empty());
    assert_eq!(second.new_items, 0);
    // 304 path never rewrites the file.
    let mtime_after = fs::metadata(&cached).unwrap().modified().unwrap();
    assert_eq!(mtime_before, mtime_after);
    // And the collection still holds the item exactly once.
    assert_eq!(engine.store_mut().articles().len(), 1);
}

#[tokio::test]
async fn test_permanent_redirect_renames_subscription_keeping_tags() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let new_path = "/moved/feed.xml";
    Mock::given(method("GET"))
        .and(path("/old/feed.xml"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", new_path))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(new_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_doc(
            "Moved Feed",
            &server.uri(),
            &[("First", "/articles/first")],
        )))
        .mount(&server)
        .await;

    let old_url = format!("{}/old/feed.xml", server.uri());
    let new_url = format!("{}{new_path}", server.uri());
    seed_registry(
        &dir.path().join("data"),
        &format!(r#"{{"feeds":{{"{old_url}":{{"tags":["news"]}}}},"tags":["news"]}}"#),
    );

    let mut engine = SyncEngine::new(config_for(&dir, &server, 5)).unwrap();
    let summary = engine.refresh(RefreshReason::Manual).await;

    assert!(summary.errors.is_empty());
    assert!(!engine.registry().contains(&old_url));
    assert!(engine.registry().contains(&new_url));
    assert_eq!(engine.registry().tags_for(&new_url), vec!["news"]);
    // The merged feed lives under the new canonical URL too.
    assert!(engine.store().feed(&new_url).is_some());
    assert_eq!(engine.store().tags().unread("news"), 1);
}

#[tokio::test]
async fn test_slow_feed_fails_alone_within_one_cycle() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/slow.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(3))
                .set_body_string(feed_doc("Slow", &server.uri(), &[])),
        )
        .mount(&server)
        .await;
    for (p, title, link) in [
        ("/a.xml", "Feed A", "/articles/a1"),
        ("/b.xml", "Feed B", "/articles/b1"),
    ] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_doc(
                title,
                &server.uri(),
                &[("Post", link)],
            )))
            .mount(&server)
            .await;
    }

    let slow_url = format!("{}/slow.xml", server.uri());
    let a_url = format!("{}/a.xml", server.uri());
    let b_url = format!("{}/b.xml", server.uri());
    seed_registry(
        &dir.path().join("data"),
        &format!(
            r#"{{"feeds":{{"{slow_url}":{{"tags":[]}},"{a_url}":{{"tags":[]}},"{b_url}":{{"tags":[]}}}}}}"#
        ),
    );

    // One-second timeout makes the delayed response a per-feed failure.
    let mut engine = SyncEngine::new(config_for(&dir, &server, 1)).unwrap();
    let mut events = engine.subscribe();
    let summary = engine.refresh(RefreshReason::Manual).await;

    assert_eq!(summary.new_items, 2);
    assert_eq!(summary.problematic_feeds, vec![slow_url]);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("timed out"));

    // Exactly one cycle: started, probed, ended, nothing more.
    let mut ended = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, freshet::engine::RefreshEvent::RefreshEnded { .. }) {
            ended += 1;
        }
    }
    assert_eq!(ended, 1);
}

#[tokio::test]
async fn test_page_url_is_rewritten_to_discovered_feed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/blog/feed.xml">
            </head><body>a blog</body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_doc(
            "Discovered Feed",
            &server.uri(),
            &[("Hello", "/articles/hello")],
        )))
        .mount(&server)
        .await;

    let page_url = format!("{}/blog", server.uri());
    let feed_url = format!("{}/blog/feed.xml", server.uri());

    let mut engine = SyncEngine::new(config_for(&dir, &server, 5)).unwrap();
    let added = engine.add_feed(&page_url).await.unwrap();

    assert!(added);
    assert!(!engine.registry().contains(&page_url));
    assert!(engine.registry().contains(&feed_url));
    let feed = engine.store().feed(&feed_url).unwrap();
    assert_eq!(feed.title, "Discovered Feed");
    assert_eq!(feed.items.len(), 1);
}

#[tokio::test]
async fn test_read_state_survives_restart() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_doc(
            "Persistent Feed",
            &server.uri(),
            &[("Keep", "/articles/keep")],
        )))
        .mount(&server)
        .await;

    let feed_url = format!("{}/feed.xml", server.uri());
    seed_registry(
        &dir.path().join("data"),
        &format!(r#"{{"feeds":{{"{feed_url}":{{"tags":[]}}}}}}"#),
    );

    {
        let mut engine = SyncEngine::new(config_for(&dir, &server, 5)).unwrap();
        engine.refresh(RefreshReason::Manual).await;
        let uid = engine.store_mut().articles()[0].uid.clone();
        assert!(engine.set_read(&uid, true));
        engine.shutdown().unwrap();
    }

    // A fresh engine re-merges the same document and the item comes back
    // already read.
    let mut engine = SyncEngine::new(config_for(&dir, &server, 5)).unwrap();
    engine.refresh(RefreshReason::Manual).await;
    let articles = engine.store_mut().articles();
    assert_eq!(articles.len(), 1);
    assert!(articles[0].read);
    assert_eq!(engine.store().feed(&feed_url).unwrap().unread_count, 0);
}
