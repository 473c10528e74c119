//! End-to-end crawl scenarios against a `wiremock::MockServer`, covering
//! spec.md §8's S1 (feed discovery), S2 (dedup across relative links), S3
//! (max-depth bound), S5 (retry on 503), and S6 (oversize body).

mod common;

use std::sync::Arc;
use std::time::Duration;

use feedsearch_crawler::{CrawlEngine, CrawlerConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::FeedSniffingSpider;

fn config_for(server: &MockServer) -> CrawlerConfig {
    CrawlerConfig::builder()
        .start_urls(vec![server.uri()])
        .full_crawl(false)
        .respect_robots(false)
        .total_timeout(Duration::from_secs(5))
        .request_timeout(Duration::from_secs(2))
        .delay(Duration::ZERO)
        .max_retries(3)
        .build()
}

/// S1: an HTML seed links to an Atom feed via `<link rel="alternate"
/// type="application/atom+xml">`; the feed's own body is a minimal valid
/// Atom document the spider recognizes by its first bytes.
#[tokio::test]
async fn atom_feed_discovered_via_html_link_tag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head>
                <link rel="alternate" type="application/atom+xml" href="/feed.xml">
            </head><body>hello</body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom">
                <title>Example Feed</title>
            </feed>"#,
        ))
        .mount(&server)
        .await;

    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config_for(&server), spider.clone()).unwrap();
    let stats = engine.crawl().await;

    let items = spider.items.lock().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].url.ends_with("/feed.xml"));

    assert!(stats["requests"]["successful"].as_u64().unwrap() >= 2);
    assert_eq!(stats["items"]["processed"], 1);
}

/// S2: `/feed` and `/feed?utm_source=x` collapse onto a single fetch
/// because `utm_source` is not a feed-hint query key.
#[tokio::test]
async fn duplicate_suppressed_across_relative_links_with_noise_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a href="/feed">a</a>
                <a href="/feed?utm_source=x">b</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    // Only one fetch to /feed should ever land here.
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
        .expect(1)
        .mount(&server)
        .await;

    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config_for(&server), spider).unwrap();
    engine.crawl().await;
    // `expect(1)` above is verified when the MockServer is dropped.
}

/// S3: a `max_depth=3` chain of feedlike-named pages (seed → /feed/a →
/// /feed/b, each one hop deeper) never reaches the fourth hop, since
/// `/feed/b`'s history is already at the depth bound when its own links
/// are discovered.
#[tokio::test]
async fn max_depth_bound_stops_the_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/feed/a">a</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/feed/b">b</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/b"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<a href="/feed/c">c</a>"#),
        )
        .mount(&server)
        .await;
    // /feed/c must never be dequeued: its history at enqueue time would
    // have length 3, which is not < max_depth=3.
    Mock::given(method("GET"))
        .and(path("/feed/c"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.max_depth = 3;
    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config, spider).unwrap();
    engine.crawl().await;
}

/// S5: the server returns 503 twice before succeeding; the downloader's
/// retry accounting should drive exactly three dispatches to the same URL.
#[tokio::test]
async fn retries_on_503_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/feed">f</a>"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss></rss>"))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.delay = Duration::ZERO;
    config.total_timeout = Duration::from_secs(10);
    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config, spider.clone()).unwrap();
    let stats = engine.crawl().await;

    assert_eq!(stats["items"]["processed"], 1);
    assert!(stats["requests"]["retried"].as_u64().unwrap() >= 2);
}

/// S6: a body declaring (or streaming past) `max_content_length` is
/// synthesized as a 413 with no item and a failed-request count.
#[tokio::test]
async fn oversize_body_is_rejected_as_413() {
    let server = MockServer::start().await;

    let oversized = "x".repeat(200);
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(oversized))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.max_content_length = 50;
    let spider = Arc::new(FeedSniffingSpider::new());
    let engine = CrawlEngine::new(config, spider.clone()).unwrap();
    let stats = engine.crawl().await;

    assert_eq!(stats["items"]["processed"], 0);
    assert!(stats["requests"]["failed"].as_u64().unwrap() >= 1);
    assert_eq!(stats["status_codes"]["413"], 1);
}
