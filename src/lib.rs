//! Core of a focused syndication-feed discovery crawler: priority work
//! queue, per-host-throttled downloader, canonicalized dedup filter,
//! middleware chain, link classifier, and bounded-memory statistics
//! collector. Feed/HTML parsing itself is an external contract (`Spider`,
//! `ContentParser`) this crate doesn't implement.

pub mod config;
pub mod core;
pub mod crawler;
pub mod dedup;
pub mod error;
pub mod linkfilter;
pub mod logging;
pub mod network;
pub mod queue;
pub mod statistics;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use core::{
    Callback, CallbackResult, FailureCallback, Method, Queueable, Request, RequestParts, Response,
    Yielded,
};
pub use crawler::{ContentParser, CrawlEngine, DiscoveredLink, Spider};
pub use dedup::DuplicateFilter;
pub use error::{CrawlError, ErrorCategory, ErrorType};
pub use linkfilter::LinkFilter;
pub use logging::init_logging;
pub use network::Downloader;
pub use queue::{PriorityQueue, QueueStats};
pub use statistics::{StatisticsLevel, StatsCollector};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
