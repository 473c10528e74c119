//! The external contract a concrete crawler implements (`Spider`,
//! `ContentParser`, `DiscoveredLink`) plus the orchestrator (`engine`) that
//! drives requests through the queue, downloader, and callback fan-out.

pub mod engine;
mod spider;

pub use engine::CrawlEngine;
pub use spider::{ContentParser, DiscoveredLink, Spider};
