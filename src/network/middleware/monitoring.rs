//! `MonitoringMiddleware`: the last link in the chain, feeding every
//! dispatched request and its outcome into the statistics collector.
//!
//! Grounded in `original_source/.../crawler/middleware/monitoring.py`, which
//! timestamped requests in `pre_request` and reported the elapsed duration
//! alongside the response in `process_response`.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use uuid::Uuid;

use std::collections::HashMap;

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::CrawlError;
use crate::statistics::StatsCollector;

use super::Middleware;

pub struct MonitoringMiddleware {
    stats: Arc<StatsCollector>,
    dispatched_at: Mutex<HashMap<Uuid, Instant>>,
}

impl MonitoringMiddleware {
    pub fn new(stats: Arc<StatsCollector>) -> Self {
        Self {
            stats,
            dispatched_at: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for MonitoringMiddleware {
    async fn pre_request(&self, request: &mut RequestParts) -> Result<(), CrawlError> {
        self.dispatched_at.lock().await.insert(request.id, Instant::now());
        Ok(())
    }

    async fn process_response(
        &self,
        request: &RequestParts,
        response: &mut Response,
    ) -> Result<(), CrawlError> {
        let elapsed = self
            .dispatched_at
            .lock()
            .await
            .remove(&request.id)
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.stats.record_response(response, elapsed).await;
        Ok(())
    }

    async fn process_exception(&self, request: &RequestParts, error: &CrawlError) {
        self.dispatched_at.lock().await.remove(&request.id);
        self.stats.record_exception(request, error).await;
    }
}
