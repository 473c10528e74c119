//! The orchestrator: wires the queue, downloader, middleware chain, link
//! filter, duplicate filter, and statistics collector into the worker-pool
//! crawl loop. Grounded in `original_source/.../crawler/crawler.py`'s
//! `Crawler` class — `crawl()`, `follow()`, `_handle_request()`,
//! `_process_request_callback_result()`, `_work()`, `is_allowed_domain()`,
//! and the built-in `parse_robots_txt` callback.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{CrawlerConfig, defaults};
use crate::core::queueable::{CallbackResult, Queueable};
use crate::core::request::{Callback, Method, Request};
use crate::core::response::Response;
use crate::core::yielded::Yielded;
use crate::dedup::DuplicateFilter;
use crate::error::CrawlError;
use crate::linkfilter::LinkFilter;
use crate::network::downloader::Downloader;
use crate::network::middleware::{
    ContentTypeMiddleware, CookieMiddleware, Middleware, MonitoringMiddleware, RetryMiddleware,
    RobotsMiddleware, ThrottleMiddleware, parse_robots_txt,
};
use crate::network::session::build_client;
use crate::queue::PriorityQueue;
use crate::statistics::StatsCollector;

use super::spider::Spider;

/// A `robots.txt` fetch is queued ahead of everything else discovered
/// during the crawl so sitemap directives surface as early as possible.
const PRIORITY_ROBOTS: i32 = 1;
/// Sitemap URLs discovered via `robots.txt` jump the queue too, but behind
/// the robots fetch itself.
const PRIORITY_SITEMAP: i32 = 5;

/// Either a fresh HTTP fetch or a deferred callback fan-out, unified so a
/// single `PriorityQueue` can hold both (`Request` and `CallbackResult` are
/// each independently `Queueable`, but a queue is monomorphic over one item
/// type).
enum WorkItem<I> {
    Request(Request<I>),
    Callback(CallbackResult<I>),
}

impl<I> Queueable for WorkItem<I> {
    fn priority(&self) -> i32 {
        match self {
            WorkItem::Request(request) => request.priority(),
            WorkItem::Callback(result) => result.priority(),
        }
    }
}

/// Drives a crawl to completion: seeds `robots.txt`/start URLs, runs a
/// worker pool over the priority queue, and returns the final
/// `StatsCollector::get_stats()` snapshot.
///
/// Holds a `Weak` self-reference (populated via `Arc::new_cyclic` in
/// `new()`) so callback closures and spawned workers can get an owned
/// `Arc<Self>` from an ordinary `&self` method, without threading an
/// `Arc<Self>` parameter through every call in the chain.
pub struct CrawlEngine<I> {
    config: CrawlerConfig,
    dedup: DuplicateFilter,
    stats: Arc<StatsCollector>,
    queue: Arc<PriorityQueue<WorkItem<I>>>,
    downloader: Downloader,
    spider: Arc<dyn Spider<I>>,
    link_filter: LinkFilter,
    download_semaphore: Arc<Semaphore>,
    parse_semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    self_ref: Weak<Self>,
}

impl<I> CrawlEngine<I>
where
    I: Send + 'static,
{
    pub fn new(config: CrawlerConfig, spider: Arc<dyn Spider<I>>) -> Result<Arc<Self>, CrawlError> {
        let client = build_client(&config)?;

        let stats = StatsCollector::new(
            config.stats_level,
            config.stats_callback_interval,
            defaults::DEFAULT_RESERVOIR_CAPACITY,
        );

        let mut middlewares: Vec<Box<dyn Middleware>> = Vec::new();
        if config.respect_robots {
            middlewares.push(Box::new(RobotsMiddleware::new(client.clone())));
        }
        middlewares.push(Box::new(ThrottleMiddleware::new(config.throttle_rate_per_sec)));
        middlewares.push(Box::new(RetryMiddleware::new()));
        middlewares.push(Box::new(CookieMiddleware::new()));
        middlewares.push(Box::new(ContentTypeMiddleware::new()));
        middlewares.push(Box::new(MonitoringMiddleware::new(Arc::clone(&stats))));

        let concurrency = config.concurrency.max(1);
        let link_filter = LinkFilter::new(config.full_crawl);
        let downloader = Downloader::new(client, middlewares);

        Ok(Arc::new_cyclic(|self_ref| Self {
            downloader,
            dedup: DuplicateFilter::new(),
            link_filter,
            queue: PriorityQueue::new(),
            download_semaphore: Arc::new(Semaphore::new(concurrency)),
            parse_semaphore: Arc::new(Semaphore::new(concurrency * 2)),
            cancel: CancellationToken::new(),
            config,
            stats,
            spider,
            self_ref: self_ref.clone(),
        }))
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    fn arc(&self) -> Arc<Self> {
        self.self_ref
            .upgrade()
            .expect("CrawlEngine method called after its own Arc was dropped")
    }

    /// Runs the crawl to completion: seeds every configured start URL, runs
    /// `worker_count()` workers until the queue drains or `total_timeout`
    /// elapses (whichever first), then tears down and returns the final
    /// stats snapshot.
    pub async fn crawl(&self) -> Value {
        self.stats.start();
        tracing::info!(seeds = self.config.start_urls.len(), "crawl starting");

        for seed in self.config.start_urls.clone() {
            self.seed(&seed).await;
        }

        let worker_count = self.config.worker_count();
        let workers: Vec<_> = (0..worker_count)
            .map(|id| {
                let engine = self.arc();
                tokio::spawn(async move { engine.run_worker(id).await })
            })
            .collect();

        tokio::select! {
            _ = self.queue.join() => {
                tracing::info!("crawl queue drained");
            }
            _ = tokio::time::sleep(self.config.total_timeout) => {
                tracing::info!(
                    timeout_secs = self.config.total_timeout.as_secs(),
                    "crawl total timeout reached, cancelling workers"
                );
            }
        }

        self.cancel.cancel();
        for worker in workers {
            let _ = worker.await;
        }
        self.queue.clear().await;
        self.stats.stop().await;
        tracing::info!("crawl finished");
        self.stats.get_stats()
    }

    async fn seed(&self, seed_url: &str) {
        let Ok(url) = Url::parse(seed_url) else {
            tracing::warn!(url = seed_url, "seed URL failed to parse, skipping");
            return;
        };
        if !self.is_allowed_scheme(&url) {
            tracing::warn!(url = %url, "seed URL scheme not allowed, skipping");
            return;
        }

        if let Some(request) = self
            .follow(seed_url, Vec::new(), crate::core::queueable::DEFAULT_REQUEST_PRIORITY, self.spider_callback())
            .await
        {
            self.enqueue_request(request).await;
        }

        let Some(host) = url.host_str() else { return };

        // Independent of the seed fetch itself, so both surface early: a
        // robots.txt fetch (which may itself discover further Sitemap:
        // directives) and the conventional /sitemap.xml location.
        if self.config.respect_robots {
            if let Ok(robots_url) = Url::parse(&format!("{}://{}/robots.txt", url.scheme(), host))
            {
                let mut request =
                    Request::new(robots_url, Method::Get).with_priority(PRIORITY_ROBOTS);
                request.parts.timeout = self.config.request_timeout;
                request.parts.max_retries = self.config.max_retries;
                request.callback = Some(self.robots_callback());
                self.enqueue_request(request).await;
            }
        }

        if let Some(request) = self
            .follow(
                &format!("{}://{}/sitemap.xml", url.scheme(), host),
                Vec::new(),
                PRIORITY_SITEMAP,
                self.spider_callback(),
            )
            .await
        {
            self.enqueue_request(request).await;
        }
    }

    /// The built-in callback for the synthetic `robots.txt` request: pulls
    /// `Sitemap:` directives out of the body and follows each one. Actual
    /// allow/disallow enforcement happens per-request inside
    /// `RobotsMiddleware`, independently of this parse.
    fn robots_callback(&self) -> Callback<I> {
        let engine = self.arc();
        Arc::new(move |_request: Request<I>, response: Response| {
            let engine = Arc::clone(&engine);
            Box::pin(async move { engine.handle_robots_response(response).await })
        })
    }

    async fn handle_robots_response(self: Arc<Self>, response: Response) -> Vec<Yielded<I>> {
        if !response.ok() {
            return Vec::new();
        }
        let rules = parse_robots_txt(&response.text);
        let mut discovered = Vec::with_capacity(rules.sitemaps.len());
        for sitemap_url in &rules.sitemaps {
            if let Some(request) = self
                .follow(sitemap_url, response.history.clone(), PRIORITY_SITEMAP, self.spider_callback())
                .await
            {
                discovered.push(Yielded::Request(request));
            }
        }
        discovered
    }

    /// Wraps the user-supplied `Spider::parse_response` as a `Callback`.
    fn spider_callback(&self) -> Callback<I> {
        let spider = Arc::clone(&self.spider);
        Arc::new(move |request: Request<I>, response: Response| {
            let spider = Arc::clone(&spider);
            Box::pin(async move { spider.parse_response(&request, &response).await })
        })
    }

    /// Resolves, bounds-checks, and dedup-checks a candidate URL, returning
    /// a ready-to-queue `Request` or `None` if it should be dropped.
    /// Mirrors `Crawler.follow()`: max-depth via history length, allowed
    /// scheme/domain, then the duplicate filter.
    async fn follow(
        &self,
        raw_url: &str,
        history: Vec<Url>,
        priority: i32,
        callback: Callback<I>,
    ) -> Option<Request<I>> {
        let url = Url::parse(raw_url).ok()?;

        if self.config.max_depth > 0 && history.len() >= self.config.max_depth {
            tracing::debug!(url = %url, depth = history.len(), "max crawl depth reached, dropping");
            return None;
        }
        if !self.is_allowed_scheme(&url) || !self.is_allowed_domain(&url) {
            return None;
        }

        let is_duplicate = self.dedup.is_url_seen(&url, Some(&Method::Get)).await;
        self.stats.record_url_seen(is_duplicate).await;
        if is_duplicate {
            return None;
        }

        let mut request = Request::new(url, Method::Get)
            .with_callback(callback)
            .with_priority(priority);
        request.parts.history = history;
        request.parts.timeout = self.config.request_timeout;
        request.parts.max_content_length = self.config.max_content_length;
        request.parts.delay = self.config.delay;
        request.parts.max_retries = self.config.max_retries;
        Some(request)
    }

    fn is_allowed_scheme(&self, url: &Url) -> bool {
        self.config
            .allowed_schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
    }

    /// `fnmatch`-style domain allow-listing: an empty list allows
    /// everything, a `*.example.com` pattern matches `example.com` and any
    /// subdomain, anything else is an exact (case-insensitive) match.
    fn is_allowed_domain(&self, url: &Url) -> bool {
        if self.config.allowed_domains.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.config
            .allowed_domains
            .iter()
            .any(|pattern| domain_pattern_matches(pattern, host))
    }

    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        tracing::debug!(worker_id, "worker starting");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(worker_id, "worker cancelled");
                    break;
                }
                dequeued = self.queue.get() => {
                    let queue_size = self.queue.len().await;
                    self.stats.record_queue_metrics(dequeued.wait_time, queue_size).await;
                    self.process_work_item(dequeued.item).await;
                    self.queue.task_done();
                }
            }
        }
    }

    async fn process_work_item(&self, item: WorkItem<I>) {
        match item {
            WorkItem::Request(request) => self.handle_request(request).await,
            WorkItem::Callback(result) => {
                self.process_callback_result(result.value, result.callback_recursion).await
            }
        }
    }

    /// Fetches a request, runs the generic link-discovery pass plus the
    /// spider's own callback over the response, and re-enqueues the
    /// request itself if the downloader flagged it for retry.
    async fn handle_request(&self, mut request: Request<I>) {
        let permit = self.download_semaphore.acquire().await.ok();
        let response = self.downloader.fetch(&mut request.parts).await;
        drop(permit);

        // Redirects can land on a URL never independently queued; fold it
        // into the seen-set so a later discovery of the same target dedupes.
        self.dedup.is_url_seen(&response.url, Some(&request.parts.method)).await;

        let mut fan_out = Vec::new();
        if response.ok() {
            fan_out.extend(self.discover_links(&response).await);
        }

        let callback = if response.ok() {
            request.callback.clone()
        } else {
            request.failure_callback.clone()
        };
        if let Some(callback) = callback {
            let permit = self.parse_semaphore.acquire().await.ok();
            let results = callback(request.clone(), response.clone()).await;
            drop(permit);
            fan_out.extend(results);
        }

        if !fan_out.is_empty() {
            self.enqueue_callback_result(CallbackResult::new(Yielded::Sub(fan_out), 0)).await;
        }

        if request.parts.should_retry {
            self.stats.record_retry().await;
            self.enqueue_request(request).await;
        }
    }

    /// The generic, spider-independent link pass: every response's body is
    /// handed to the spider's `ContentParser`, and every link it finds is
    /// run through the `LinkFilter` before being turned into a follow-up
    /// request. This is distinct from `Spider::parse_response`'s own
    /// fan-out, which is for whatever caller-specific requests/items the
    /// spider wants to yield alongside it.
    async fn discover_links(&self, response: &Response) -> Vec<Yielded<I>> {
        let links = self.spider.content_parser().parse(&response.url, &response.text);
        let mut discovered = Vec::with_capacity(links.len());
        for link in links {
            let Some((url, priority)) =
                self.link_filter.classify(&response.url, &link.href, link.link_type.as_deref())
            else {
                continue;
            };
            if let Some(request) = self
                .follow(url.as_str(), response.history.clone(), priority, self.spider_callback())
                .await
            {
                discovered.push(Yielded::Request(request));
            }
        }
        discovered
    }

    /// Recursively drains a callback's fan-out, bounded by
    /// `max_callback_recursion` so a pathological `Sub(Sub(Sub(...)))`
    /// chain can't grow the queue without bound.
    async fn process_callback_result(&self, value: Yielded<I>, depth: u32) {
        if depth >= self.config.max_callback_recursion {
            tracing::warn!(depth, "callback recursion bound exceeded, dropping result");
            return;
        }
        match value {
            Yielded::Request(request) => self.enqueue_request(request).await,
            Yielded::Item(item) => {
                self.spider.process_item(item).await;
                self.stats.record_item_processed().await;
            }
            Yielded::Sub(items) => {
                for item in items {
                    self.enqueue_callback_result(CallbackResult::new(item, depth + 1)).await;
                }
            }
        }
    }

    async fn enqueue_request(&self, request: Request<I>) {
        self.stats.record_request_queued();
        self.queue.put(WorkItem::Request(request)).await;
    }

    async fn enqueue_callback_result(&self, result: CallbackResult<I>) {
        self.queue.put(WorkItem::Callback(result)).await;
    }
}

fn domain_pattern_matches(pattern: &str, host: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host.eq_ignore_ascii_case(suffix)
            || host.to_ascii_lowercase().ends_with(&format!(".{}", suffix.to_ascii_lowercase()));
    }
    pattern.eq_ignore_ascii_case(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_domain_pattern_matches_subdomains() {
        assert!(domain_pattern_matches("*.example.com", "blog.example.com"));
        assert!(domain_pattern_matches("*.example.com", "example.com"));
        assert!(!domain_pattern_matches("*.example.com", "example.org"));
    }

    #[test]
    fn exact_domain_pattern_is_case_insensitive() {
        assert!(domain_pattern_matches("Example.com", "example.COM"));
        assert!(!domain_pattern_matches("example.com", "other.com"));
    }
}
