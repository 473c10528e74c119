//! Shared HTTP session construction, one per crawl run.
//!
//! Connection pool sizing follows spec §6's wire behavior: 100 total idle
//! connections, `concurrency` per host, 30s keepalive, limited redirects.
//! IPv4/IPv6 happy-eyeballs is reqwest's/hyper's native resolver behavior
//! and isn't reimplemented here.

use std::time::Duration;

use reqwest::Client;

use crate::config::{CrawlerConfig, defaults};
use crate::error::CrawlError;

pub fn build_client(config: &CrawlerConfig) -> Result<Client, CrawlError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(defaults::MAX_REDIRECTS))
        .pool_max_idle_per_host(config.concurrency)
        .pool_idle_timeout(Duration::from_secs(
            defaults::DEFAULT_CONNECTION_IDLE_TIMEOUT_SECS,
        ))
        .timeout(config.request_timeout)
        .danger_accept_invalid_certs(!config.ssl);

    if !config.headers.is_empty() {
        let mut default_headers = reqwest::header::HeaderMap::new();
        for (key, value) in config.merged_headers() {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::from_bytes(key.as_bytes()),
                reqwest::header::HeaderValue::from_str(&value),
            ) {
                default_headers.insert(name, val);
            }
        }
        builder = builder.default_headers(default_headers);
    }

    builder
        .build()
        .map_err(|e| CrawlError::Other(format!("failed to build HTTP client: {e}")))
}
