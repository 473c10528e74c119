//! Crawl configuration, following the teacher's `WebCrawlerConfig` shape:
//! a plain `Default`-able struct plus a fluent builder.

use std::time::Duration;

use serde::Deserialize;

use crate::statistics::StatisticsLevel;

/// Default tuning constants, named the way `boyboi86`'s
/// `config::defaults` module names them.
pub mod defaults {
    pub const DEFAULT_CONCURRENCY: usize = 10;
    pub const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
    pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;
    pub const DEFAULT_MAX_DEPTH: usize = 10;
    pub const DEFAULT_MAX_CALLBACK_RECURSION: u32 = 10;
    pub const DEFAULT_DELAY_MS: u64 = 500;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_STATS_CALLBACK_INTERVAL_SECS: u64 = 5;
    pub const DEFAULT_CONNECTION_POOL_SIZE: usize = 100;
    pub const DEFAULT_CONNECTION_IDLE_TIMEOUT_SECS: u64 = 30;
    pub const MAX_REDIRECTS: usize = 10;
    /// Reservoir sample cap for `Detailed`-level percentile tracking,
    /// matching the Python original's `PercentileTracker` default.
    pub const DEFAULT_RESERVOIR_CAPACITY: usize = 10_000;
    pub const DEFAULT_APP_USER_AGENT: &str =
        "Mozilla/5.0 (compatible; feedsearch-crawler; +https://example.invalid/bot)";
}

/// Top-level crawler configuration, consumed by the orchestrator at
/// construction time. Every field corresponds to a named option in the
/// spec's External Interfaces section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub start_urls: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub allowed_schemes: Vec<String>,
    pub concurrency: usize,
    pub total_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_content_length: usize,
    pub max_depth: usize,
    pub max_callback_recursion: u32,
    pub headers: Vec<(String, String)>,
    pub delay: Duration,
    pub max_retries: u32,
    pub ssl: bool,
    pub trace: bool,
    pub respect_robots: bool,
    pub throttle_rate_per_sec: f64,
    pub full_crawl: bool,
    pub stats_level: StatisticsLevel,
    pub stats_callback_interval: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_urls: Vec::new(),
            allowed_domains: Vec::new(),
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            concurrency: defaults::DEFAULT_CONCURRENCY,
            total_timeout: Duration::from_secs(defaults::DEFAULT_TOTAL_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: defaults::DEFAULT_APP_USER_AGENT.to_string(),
            max_content_length: defaults::DEFAULT_MAX_CONTENT_LENGTH,
            max_depth: defaults::DEFAULT_MAX_DEPTH,
            max_callback_recursion: defaults::DEFAULT_MAX_CALLBACK_RECURSION,
            headers: Vec::new(),
            delay: Duration::from_millis(defaults::DEFAULT_DELAY_MS),
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            ssl: false,
            trace: false,
            respect_robots: true,
            throttle_rate_per_sec: 2.0,
            full_crawl: false,
            stats_level: StatisticsLevel::Standard,
            stats_callback_interval: Duration::from_secs(
                defaults::DEFAULT_STATS_CALLBACK_INTERVAL_SECS,
            ),
        }
    }
}

impl CrawlerConfig {
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::default()
    }

    /// Worker count: `min(max(concurrency, 1.5 * concurrency), 20)`.
    pub fn worker_count(&self) -> usize {
        let scaled = (self.concurrency as f64 * 1.5).ceil() as usize;
        self.concurrency.max(scaled).min(20).max(1)
    }

    /// Headers merged with the default `User-Agent` and
    /// `Upgrade-Insecure-Requests: 1`, per spec.
    pub fn merged_headers(&self) -> Vec<(String, String)> {
        let mut merged = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ];
        merged.extend(self.headers.iter().cloned());
        merged
    }
}

/// Fluent builder mirroring the teacher's `config_builder.rs` pattern.
#[derive(Debug, Clone, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfigInner,
}

#[derive(Debug, Clone)]
struct CrawlerConfigInner(CrawlerConfig);

impl Default for CrawlerConfigInner {
    fn default() -> Self {
        Self(CrawlerConfig::default())
    }
}

macro_rules! builder_setter {
    ($name:ident, $field:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.config.0.$field = value;
            self
        }
    };
}

impl CrawlerConfigBuilder {
    pub fn start_urls(mut self, urls: Vec<String>) -> Self {
        self.config.0.start_urls = urls;
        self
    }

    builder_setter!(allowed_domains, allowed_domains, Vec<String>);
    builder_setter!(allowed_schemes, allowed_schemes, Vec<String>);
    builder_setter!(concurrency, concurrency, usize);
    builder_setter!(total_timeout, total_timeout, Duration);
    builder_setter!(request_timeout, request_timeout, Duration);
    builder_setter!(user_agent, user_agent, String);
    builder_setter!(max_content_length, max_content_length, usize);
    builder_setter!(max_depth, max_depth, usize);
    builder_setter!(max_callback_recursion, max_callback_recursion, u32);
    builder_setter!(headers, headers, Vec<(String, String)>);
    builder_setter!(delay, delay, Duration);
    builder_setter!(max_retries, max_retries, u32);
    builder_setter!(ssl, ssl, bool);
    builder_setter!(trace, trace, bool);
    builder_setter!(respect_robots, respect_robots, bool);
    builder_setter!(throttle_rate_per_sec, throttle_rate_per_sec, f64);
    builder_setter!(full_crawl, full_crawl, bool);
    builder_setter!(stats_level, stats_level, StatisticsLevel);
    builder_setter!(stats_callback_interval, stats_callback_interval, Duration);

    pub fn build(self) -> CrawlerConfig {
        self.config.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_bounded_between_concurrency_and_20() {
        let cfg = CrawlerConfig::builder().concurrency(10).build();
        assert_eq!(cfg.worker_count(), 15);

        let cfg = CrawlerConfig::builder().concurrency(100).build();
        assert_eq!(cfg.worker_count(), 20);

        let cfg = CrawlerConfig::builder().concurrency(1).build();
        assert_eq!(cfg.worker_count(), 1);
    }

    #[test]
    fn merged_headers_always_carries_user_agent() {
        let cfg = CrawlerConfig::builder()
            .user_agent("test-agent".to_string())
            .headers(vec![("X-Custom".to_string(), "1".to_string())])
            .build();
        let merged = cfg.merged_headers();
        assert!(merged.contains(&("User-Agent".to_string(), "test-agent".to_string())));
        assert!(merged.contains(&("X-Custom".to_string(), "1".to_string())));
    }
}
