//! The external contract spec.md §6 leaves outside this crate's scope:
//! real feed/HTML parsing. `Spider` is the hook a concrete crawler
//! implements; `ContentParser` is the narrower text-to-links piece of it,
//! split out so tests can supply a minimal one (see `tests/common/mod.rs`)
//! without implementing RSS/Atom/JSON-Feed parsing.

use url::Url;

use crate::core::request::Request;
use crate::core::response::Response;
use crate::core::yielded::Yielded;

/// A link discovered in a page body, before `LinkFilter` has classified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub href: String,
    /// The `type` attribute of a `<link>` tag, e.g. `"application/rss+xml"`.
    pub link_type: Option<String>,
}

/// Extracts candidate links from response text. Implementations decide
/// how to parse the body (HTML `<a>`/`<link>`, a sitemap's `<loc>` tags,
/// ...); this crate ships none and is only exercised by test doubles.
pub trait ContentParser: Send + Sync {
    fn parse(&self, base: &Url, text: &str) -> Vec<DiscoveredLink>;
}

/// The per-crawl-run hook that turns a `Response` into further work.
/// `I` is the caller's parsed-item type (what ends up in `Yielded::Item`).
#[async_trait::async_trait]
pub trait Spider<I>: Send + Sync {
    async fn parse_response(&self, request: &Request<I>, response: &Response) -> Vec<Yielded<I>>;

    fn content_parser(&self) -> &dyn ContentParser;

    /// Sink for a finished `Yielded::Item(I)`. The engine's generic
    /// link-following pass never produces items itself (only `Request`
    /// fan-out); this is the only place a crawl run's items actually leave
    /// the crate.
    async fn process_item(&self, item: I);
}
