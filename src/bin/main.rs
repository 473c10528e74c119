//! A minimal CLI demo driving `CrawlEngine` end to end: an `Html`-backed
//! `ContentParser` (via `scraper`, already a stack dependency) harvests
//! `<a>`/`<link>` hrefs, and the demo `Spider` just logs whatever the link
//! classifier decided was feed-worthy. Real feed parsing, OPML output, and
//! a full CLI surface are out of this crate's scope — this binary exists
//! only to exercise the core against a real URL.

use std::sync::Arc;

use anyhow::{Context, Error};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use feedsearch_crawler::{
    ContentParser, CrawlEngine, CrawlerConfig, DiscoveredLink, Request, Response, Spider, Yielded,
};

struct HtmlLinkParser {
    link_selector: Selector,
    anchor_selector: Selector,
}

impl HtmlLinkParser {
    fn new() -> Self {
        Self {
            link_selector: Selector::parse("link[href]").expect("static selector is valid"),
            anchor_selector: Selector::parse("a[href]").expect("static selector is valid"),
        }
    }
}

impl ContentParser for HtmlLinkParser {
    fn parse(&self, _base: &Url, text: &str) -> Vec<DiscoveredLink> {
        let document = Html::parse_document(text);
        let mut links = Vec::new();

        for element in document.select(&self.link_selector) {
            if let Some(href) = element.value().attr("href") {
                links.push(DiscoveredLink {
                    href: href.to_string(),
                    link_type: element.value().attr("type").map(str::to_string),
                });
            }
        }
        for element in document.select(&self.anchor_selector) {
            if let Some(href) = element.value().attr("href") {
                links.push(DiscoveredLink {
                    href: href.to_string(),
                    link_type: None,
                });
            }
        }
        links
    }
}

/// The demo's item type: a feed URL the generic link-discovery pass
/// decided was worth following and that came back with a 2xx status.
struct FeedHit {
    url: String,
    status_code: u16,
}

struct DemoSpider {
    content_parser: HtmlLinkParser,
}

#[async_trait]
impl Spider<FeedHit> for DemoSpider {
    async fn parse_response(
        &self,
        _request: &Request<FeedHit>,
        response: &Response,
    ) -> Vec<Yielded<FeedHit>> {
        vec![Yielded::Item(FeedHit {
            url: response.url.to_string(),
            status_code: response.status_code,
        })]
    }

    fn content_parser(&self) -> &dyn ContentParser {
        &self.content_parser
    }

    async fn process_item(&self, item: FeedHit) {
        info!(url = %item.url, status = item.status_code, "visited");
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    feedsearch_crawler::init_logging()?;

    let start_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());
    Url::parse(&start_url).context("start URL must be a valid URL")?;

    let config = CrawlerConfig::builder()
        .start_urls(vec![start_url])
        .full_crawl(true)
        .build();

    let spider = Arc::new(DemoSpider {
        content_parser: HtmlLinkParser::new(),
    });

    let engine = CrawlEngine::new(config, spider)?;
    let stats = engine.crawl().await;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
