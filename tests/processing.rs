//! Testable properties from spec.md §8 that span the whole crawl rather
//! than a single component: the queued/successful/failed accounting
//! invariant (property 4) and the total-timeout grace bound (property 7).

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use feedsearch_crawler::{CrawlEngine, CrawlerConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::FeedSniffingSpider;

/// Property 4: `requests_queued >= successful + failed` holds at every
/// snapshot, with equality once the crawl has fully drained.
#[tokio::test]
async fn queued_count_accounts_for_every_terminal_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/feed-one">a</a><a href="/feed-two">b</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed-one"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed-two"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = CrawlerConfig::builder()
        .start_urls(vec![server.uri()])
        .respect_robots(false)
        .total_timeout(Duration::from_secs(5))
        .max_retries(0)
        .build();

    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config, spider).unwrap();
    let stats = engine.crawl().await;

    let queued = stats["requests"]["queued"].as_u64().unwrap();
    let successful = stats["requests"]["successful"].as_u64().unwrap();
    let failed = stats["requests"]["failed"].as_u64().unwrap();
    assert!(queued >= successful + failed);
}

/// Property 7: a crawl that never drains (the seed never responds) still
/// returns within `total_timeout` plus a small grace for worker teardown.
#[tokio::test]
async fn total_timeout_bounds_crawl_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    // request_timeout bounds any single in-flight fetch, so the "let an
    // in-flight request complete" rule (spec.md §5) doesn't let a single
    // slow response blow through total_timeout by an unbounded amount.
    let config = CrawlerConfig::builder()
        .start_urls(vec![server.uri()])
        .respect_robots(false)
        .total_timeout(Duration::from_millis(300))
        .request_timeout(Duration::from_millis(500))
        .build();

    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config, spider).unwrap();

    let start = Instant::now();
    engine.crawl().await;
    assert!(start.elapsed() < Duration::from_secs(3));
}
