//! Shared test doubles standing in for the external feed-parser/HTML-DOM
//! contract the crate leaves out of scope: a `ContentParser` built on
//! `scraper` (already a stack dependency) and a `Spider` that records the
//! feed-info items a real spider's `parse_response` would emit.

use std::sync::Mutex;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use feedsearch_crawler::{ContentParser, DiscoveredLink, Request, Response, Spider, Yielded};

pub struct HtmlLinkParser {
    link_selector: Selector,
    anchor_selector: Selector,
}

impl HtmlLinkParser {
    pub fn new() -> Self {
        Self {
            link_selector: Selector::parse("link[href]").unwrap(),
            anchor_selector: Selector::parse("a[href]").unwrap(),
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

/// A feed the spider's `parse_response` decided the response body was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub url: String,
}

/// Stands in for a real spider's `parse_response`: recognizes a JSON Feed
/// by its `version`/`feed_url` keys and an RSS/Atom/RDF document by its
/// first bytes, matching spec.md §4.6's feed-spider specialization
/// contract. Everything else falls through to the engine's own generic
/// link-discovery pass.
pub struct FeedSniffingSpider {
    content_parser: HtmlLinkParser,
    pub items: Mutex<Vec<FeedItem>>,
}

impl FeedSniffingSpider {
    pub fn new() -> Self {
        Self {
            content_parser: HtmlLinkParser::new(),
            items: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Spider<FeedItem> for FeedSniffingSpider {
    async fn parse_response(
        &self,
        _request: &Request<FeedItem>,
        response: &Response,
    ) -> Vec<Yielded<FeedItem>> {
        if !response.ok() {
            return Vec::new();
        }

        let is_json_feed = response
            .json
            .get("version")
            .and_then(|v| v.as_str())
            .map(|v| v.contains("jsonfeed"))
            .unwrap_or(false)
            && response.json.get("feed_url").is_some();

        let looks_like_xml_feed = response
            .text
            .get(..response.text.len().min(1000))
            .map(|head| {
                let head = head.trim_start();
                head.starts_with("<rss")
                    || head.starts_with("<feed")
                    || head.starts_with("<rdf")
                    || head.starts_with("<?xml") && (head.contains("<rss") || head.contains("<feed"))
            })
            .unwrap_or(false);

        if is_json_feed || looks_like_xml_feed {
            vec![Yielded::Item(FeedItem {
                url: response.url.to_string(),
            })]
        } else {
            Vec::new()
        }
    }

    fn content_parser(&self) -> &dyn ContentParser {
        &self.content_parser
    }

    async fn process_item(&self, item: FeedItem) {
        self.items.lock().unwrap().push(item);
    }
}
