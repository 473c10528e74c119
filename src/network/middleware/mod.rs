//! The downloader middleware chain. Each middleware implements the four
//! lifecycle hooks the downloader invokes in order: `pre_request`,
//! `process_request`, `process_response`, `process_exception`.
//!
//! Built-in ordering, per spec §4.4: robots → throttle → retry → cookies →
//! content-type → monitoring.

mod content_type;
mod cookie;
mod monitoring;
mod retry;
mod robots;
mod throttle;

pub use content_type::ContentTypeMiddleware;
pub use cookie::CookieMiddleware;
pub use monitoring::MonitoringMiddleware;
pub use retry::RetryMiddleware;
pub use robots::{RobotsMiddleware, RobotsRules, parse_robots_txt};
pub use throttle::ThrottleMiddleware;

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::CrawlError;

/// A downloader middleware hook. All methods have no-op defaults so a
/// middleware only overrides what it needs.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn pre_request(&self, _request: &mut RequestParts) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn process_request(&self, _request: &mut RequestParts) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn process_response(
        &self,
        _request: &RequestParts,
        _response: &mut Response,
    ) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn process_exception(&self, _request: &RequestParts, _error: &CrawlError) {}
}
