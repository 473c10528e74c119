//! `RetryMiddleware`: flags responses with a retryable status (408, 429,
//! 503) for another attempt by setting `Response::should_retry`; the
//! downloader re-enqueues the originating request with `set_retry()` applied.
//!
//! Grounded in `original_source/.../crawler/middleware/retry.py`.

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::CrawlError;

use super::Middleware;

pub struct RetryMiddleware;

impl RetryMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Middleware for RetryMiddleware {
    async fn process_response(
        &self,
        _request: &RequestParts,
        response: &mut Response,
    ) -> Result<(), CrawlError> {
        response.should_retry = CrawlError::is_retryable_status(response.status_code);
        Ok(())
    }

    async fn process_exception(&self, _request: &RequestParts, error: &CrawlError) {
        tracing::debug!(%error, "transport exception, eligible for retry");
    }
}
