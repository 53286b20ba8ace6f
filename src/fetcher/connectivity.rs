//! Cheap network-reachability check.
//!
//! A single HEAD request against a configurable probe host, run before a
//! refresh cycle decides between network and cache-only mode. Any HTTP
//! response at all counts as online; only transport-level failures count
//! as offline.

use std::time::Duration;

use reqwest::Client;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn is_online(client: &Client, probe_url: &str) -> bool {
    match client
        .head(probe_url)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("connectivity probe failed: {}", e);
            false
        }
    }
}
