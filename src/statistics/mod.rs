//! Bounded-memory statistics collection, grounded in
//! `original_source/.../crawler/statistics.py`: streaming aggregates so
//! memory stays flat regardless of crawl size, plus a capped reservoir
//! sample for percentile estimates at the `Detailed` level.

mod reservoir;
mod streaming;

pub use reservoir::ReservoirSampler;
pub use streaming::StreamingStat;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::{CrawlError, ErrorCategory};

const MAX_RECENT_ERRORS: usize = 100;
const RECENT_ERRORS_IN_SUMMARY: usize = 10;
const TOP_HOSTS_IN_SUMMARY: usize = 10;

/// How much detail the collector tracks. `Minimal` costs nothing beyond a
/// handful of atomics; `Detailed` adds reservoir percentiles and per-host
/// breakdowns at the price of a few extra allocations per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsLevel {
    Minimal,
    Standard,
    Detailed,
}

impl Default for StatisticsLevel {
    fn default() -> Self {
        StatisticsLevel::Standard
    }
}

impl StatisticsLevel {
    fn tracks_streaming_stats(self) -> bool {
        matches!(self, StatisticsLevel::Standard | StatisticsLevel::Detailed)
    }

    fn tracks_percentiles(self) -> bool {
        matches!(self, StatisticsLevel::Detailed)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ErrorRecord {
    elapsed_since_start_ms: u64,
    category: &'static str,
    message: String,
    status_code: Option<u16>,
    url: Option<String>,
}

/// Callback invoked on `callback_interval`, and once more at `stop()`, with
/// the current `get_stats()` snapshot.
pub type StatsCallback = Arc<dyn Fn(Value) + Send + Sync>;

struct StreamingStats {
    request_duration_ms: Mutex<StreamingStat>,
    request_latency_ms: Mutex<StreamingStat>,
    content_length_bytes: Mutex<StreamingStat>,
    queue_wait_ms: Mutex<StreamingStat>,
    queue_size: Mutex<StreamingStat>,
}

impl StreamingStats {
    fn new() -> Self {
        Self {
            request_duration_ms: Mutex::new(StreamingStat::default()),
            request_latency_ms: Mutex::new(StreamingStat::default()),
            content_length_bytes: Mutex::new(StreamingStat::default()),
            queue_wait_ms: Mutex::new(StreamingStat::default()),
            queue_size: Mutex::new(StreamingStat::default()),
        }
    }
}

struct Percentiles {
    request_duration_ms: Mutex<ReservoirSampler>,
    request_latency_ms: Mutex<ReservoirSampler>,
}

impl Percentiles {
    fn new(capacity: usize) -> Self {
        Self {
            request_duration_ms: Mutex::new(ReservoirSampler::new(capacity)),
            request_latency_ms: Mutex::new(ReservoirSampler::new(capacity)),
        }
    }
}

pub struct StatsCollector {
    level: StatisticsLevel,
    start_time: Instant,
    end_time: Mutex<Option<Instant>>,

    requests_queued: AtomicU64,
    requests_successful: AtomicU64,
    requests_failed: AtomicU64,
    requests_retried: AtomicU64,
    items_processed: AtomicU64,
    urls_seen: AtomicU64,
    duplicate_urls_filtered: AtomicU64,
    robots_txt_blocks: AtomicU64,

    status_codes: Mutex<HashMap<u16, u64>>,
    errors_by_category: Mutex<HashMap<ErrorCategory, u64>>,
    recent_errors: Mutex<VecDeque<ErrorRecord>>,

    streaming: Option<StreamingStats>,
    percentiles: Option<Percentiles>,

    host_request_counts: Mutex<HashMap<String, u64>>,
    host_duration_stats: Mutex<HashMap<String, StreamingStat>>,

    callback: Option<StatsCallback>,
    callback_interval: Duration,
    cancel: CancellationToken,
    callback_task: Mutex<Option<JoinHandle<()>>>,
    self_ref: Weak<Self>,
}

impl StatsCollector {
    pub fn new(level: StatisticsLevel, callback_interval: Duration, max_samples: usize) -> Arc<Self> {
        Self::with_callback(level, None, callback_interval, max_samples)
    }

    pub fn with_callback(
        level: StatisticsLevel,
        callback: Option<StatsCallback>,
        callback_interval: Duration,
        max_samples: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            level,
            start_time: Instant::now(),
            end_time: Mutex::new(None),
            requests_queued: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            requests_retried: AtomicU64::new(0),
            items_processed: AtomicU64::new(0),
            urls_seen: AtomicU64::new(0),
            duplicate_urls_filtered: AtomicU64::new(0),
            robots_txt_blocks: AtomicU64::new(0),
            status_codes: Mutex::new(HashMap::new()),
            errors_by_category: Mutex::new(HashMap::new()),
            recent_errors: Mutex::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
            streaming: level.tracks_streaming_stats().then(StreamingStats::new),
            percentiles: level.tracks_percentiles().then(|| Percentiles::new(max_samples)),
            host_request_counts: Mutex::new(HashMap::new()),
            host_duration_stats: Mutex::new(HashMap::new()),
            callback,
            callback_interval,
            cancel: CancellationToken::new(),
            callback_task: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Spawns the periodic callback task, if a callback was configured.
    /// No-op otherwise. Matches the teacher's pattern of a self-contained
    /// background task cancelled by a token rather than an abort handle.
    pub fn start(&self) {
        let Some(callback) = self.callback.clone() else {
            return;
        };
        let collector = self
            .self_ref
            .upgrade()
            .expect("StatsCollector::start called after its own Arc was dropped");
        let interval = self.callback_interval;
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        callback(collector.get_stats());
                    }
                }
            }
        });
        *self.callback_task.lock().unwrap() = Some(handle);
    }

    /// Finalizes `end_time` and stops the periodic callback task, firing it
    /// once more with the final snapshot beforehand.
    pub async fn stop(&self) {
        *self.end_time.lock().unwrap() = Some(Instant::now());
        self.cancel.cancel();
        if let Some(callback) = &self.callback {
            callback(self.get_stats());
        }
        if let Some(handle) = self.callback_task.lock().unwrap().take() {
            let _ = handle.await;
        }
    }

    pub fn record_request_queued(&self) {
        self.requests_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_retry(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_item_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_url_seen(&self, is_duplicate: bool) {
        self.urls_seen.fetch_add(1, Ordering::Relaxed);
        if is_duplicate {
            self.duplicate_urls_filtered.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn record_robots_block(&self) {
        self.robots_txt_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn record_queue_metrics(&self, wait: Duration, queue_size: usize) {
        let Some(streaming) = &self.streaming else {
            return;
        };
        streaming
            .queue_wait_ms
            .lock()
            .unwrap()
            .add(wait.as_secs_f64() * 1000.0);
        streaming
            .queue_size
            .lock()
            .unwrap()
            .add(queue_size as f64);
    }

    /// Called from `MonitoringMiddleware::process_response` with the
    /// request's dispatch-to-response elapsed time. Buckets success/failure
    /// on `response.ok()` and feeds the duration/content-length aggregates.
    pub async fn record_response(&self, response: &Response, elapsed: Duration) {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        *self
            .status_codes
            .lock()
            .unwrap()
            .entry(response.status_code)
            .or_insert(0) += 1;

        if response.ok() {
            self.requests_successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
            let category = response
                .error_type
                .map(|error_type| error_type.category(response.status_code))
                .unwrap_or(ErrorCategory::Other);
            self.push_error(
                category,
                format!("http status {}", response.status_code),
                Some(response.status_code),
                Some(response.url.to_string()),
            );
        }

        if let Some(streaming) = &self.streaming {
            streaming.request_duration_ms.lock().unwrap().add(duration_ms);
            streaming
                .content_length_bytes
                .lock()
                .unwrap()
                .add(response.content_length as f64);
        }

        if let Some(percentiles) = &self.percentiles {
            percentiles.request_duration_ms.lock().unwrap().add(duration_ms);
        }

        if self.level == StatisticsLevel::Detailed {
            if let Some(host) = response.url.host_str() {
                *self
                    .host_request_counts
                    .lock()
                    .unwrap()
                    .entry(host.to_string())
                    .or_insert(0) += 1;
                self.host_duration_stats
                    .lock()
                    .unwrap()
                    .entry(host.to_string())
                    .or_default()
                    .add(duration_ms);
            }
        }
    }

    pub async fn record_exception(&self, request: &RequestParts, error: &CrawlError) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if matches!(error, CrawlError::BlockedByRobots(_)) {
            self.record_robots_block().await;
        }
        let category = match error {
            CrawlError::BlockedByRobots(_) => ErrorCategory::Robots,
            CrawlError::Timeout => ErrorCategory::Timeout,
            CrawlError::Transport(_) => ErrorCategory::Network,
            CrawlError::InvalidUrl(_) | CrawlError::DomainNotAllowed | CrawlError::SchemeNotAllowed => {
                ErrorCategory::Validation
            }
            _ => ErrorCategory::Other,
        };
        self.push_error(category, error, None, Some(request.url.to_string()));
    }

    fn push_error(
        &self,
        category: ErrorCategory,
        message: impl std::fmt::Display,
        status_code: Option<u16>,
        url: Option<String>,
    ) {
        *self.errors_by_category.lock().unwrap().entry(category).or_insert(0) += 1;
        let mut recent = self.recent_errors.lock().unwrap();
        if recent.len() >= MAX_RECENT_ERRORS {
            recent.pop_front();
        }
        recent.push_back(ErrorRecord {
            elapsed_since_start_ms: self.start_time.elapsed().as_millis() as u64,
            category: category.as_str(),
            message: message.to_string(),
            status_code,
            url,
        });
    }

    /// Produces the same grouped shape as the Python original's
    /// `get_stats()`: `summary`, `requests`, `items`, `urls`, `status_codes`,
    /// `errors`, and (level-dependent) `performance`, `content`, `queue`,
    /// `hosts`.
    pub fn get_stats(&self) -> Value {
        let end = self.end_time.lock().unwrap().unwrap_or_else(Instant::now);
        let total_duration = end.saturating_duration_since(self.start_time).as_secs_f64();

        let successful = self.requests_successful.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let total_requests = successful + failed;
        let success_rate = if total_requests > 0 {
            successful as f64 / total_requests as f64
        } else {
            0.0
        };

        let mut stats = json!({
            "summary": {
                "total_duration_sec": round2(total_duration),
                "total_requests": total_requests,
                "success_rate": round3(success_rate),
                "requests_per_second": if total_duration > 0.0 {
                    round2(total_requests as f64 / total_duration)
                } else {
                    0.0
                },
            },
            "requests": {
                "queued": self.requests_queued.load(Ordering::Relaxed),
                "successful": successful,
                "failed": failed,
                "retried": self.requests_retried.load(Ordering::Relaxed),
            },
            "items": {
                "processed": self.items_processed.load(Ordering::Relaxed),
            },
            "urls": {
                "seen": self.urls_seen.load(Ordering::Relaxed),
                "duplicates_filtered": self.duplicate_urls_filtered.load(Ordering::Relaxed),
                "robots_blocked": self.robots_txt_blocks.load(Ordering::Relaxed),
            },
            "status_codes": self.status_codes.lock().unwrap().iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect::<HashMap<_, _>>(),
            "errors": {
                "by_category": self.errors_by_category.lock().unwrap().iter()
                    .map(|(category, count)| (category.as_str().to_string(), *count))
                    .collect::<HashMap<_, _>>(),
                "recent": self.recent_errors.lock().unwrap().iter()
                    .rev()
                    .take(RECENT_ERRORS_IN_SUMMARY)
                    .rev()
                    .cloned()
                    .collect::<Vec<_>>(),
            },
        });

        if let Some(streaming) = &self.streaming {
            let mut performance = json!({});
            add_stat_if_present(&mut performance, "request_duration_ms", &streaming.request_duration_ms);
            add_stat_if_present(&mut performance, "request_latency_ms", &streaming.request_latency_ms);
            stats["performance"] = performance;

            let content_stats = streaming.content_length_bytes.lock().unwrap();
            if content_stats.count() > 0 {
                let mut content = json!({
                    "total_bytes": content_stats.sum() as u64,
                    "mean_bytes": content_stats.mean() as u64,
                    "min_bytes": content_stats.min() as u64,
                    "max_bytes": content_stats.max() as u64,
                });
                if total_duration > 0.0 {
                    let bytes_per_sec = content_stats.sum() / total_duration;
                    content["bytes_per_second"] = json!(bytes_per_sec as u64);
                    content["megabytes_per_second"] = json!(round2(bytes_per_sec / 1024.0 / 1024.0));
                }
                stats["content"] = content;
            }
            drop(content_stats);

            let mut queue = json!({});
            let wait_stats = streaming.queue_wait_ms.lock().unwrap();
            if wait_stats.count() > 0 {
                queue["wait_time_ms"] = json!({
                    "mean": round2(wait_stats.mean()),
                    "min": round2(wait_stats.min()),
                    "max": round2(wait_stats.max()),
                });
            }
            drop(wait_stats);
            let size_stats = streaming.queue_size.lock().unwrap();
            if size_stats.count() > 0 {
                queue["size"] = json!({
                    "mean": round2(size_stats.mean()),
                    "min": size_stats.min() as u64,
                    "max": size_stats.max() as u64,
                });
            }
            drop(size_stats);
            if queue.as_object().is_some_and(|o| !o.is_empty()) {
                stats["queue"] = queue;
            }
        }

        if let Some(percentiles) = &self.percentiles {
            let duration = percentiles.request_duration_ms.lock().unwrap();
            if !duration.is_empty() {
                stats["performance"]["request_duration_percentiles_ms"] = duration.get_percentiles();
            }
            drop(duration);
            let latency = percentiles.request_latency_ms.lock().unwrap();
            if !latency.is_empty() {
                stats["performance"]["request_latency_percentiles_ms"] = latency.get_percentiles();
            }
        }

        if self.level == StatisticsLevel::Detailed {
            let counts = self.host_request_counts.lock().unwrap();
            let durations = self.host_duration_stats.lock().unwrap();
            let mut top: Vec<(&String, &u64)> = counts.iter().collect();
            top.sort_by(|a, b| b.1.cmp(a.1));
            let mut hosts = serde_json::Map::new();
            for (host, count) in top.into_iter().take(TOP_HOSTS_IN_SUMMARY) {
                if let Some(duration) = durations.get(host) {
                    hosts.insert(
                        host.clone(),
                        json!({ "requests": count, "mean_duration_ms": round2(duration.mean()) }),
                    );
                }
            }
            stats["hosts"] = Value::Object(hosts);
        }

        stats
    }
}

fn add_stat_if_present(target: &mut Value, key: &str, stat: &Mutex<StreamingStat>) {
    let stat = stat.lock().unwrap();
    if stat.count() > 0 {
        target[key] = json!({
            "mean": round2(stat.mean()),
            "min": round2(stat.min()),
            "max": round2(stat.max()),
            "stddev": round2(stat.stddev()),
        });
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::Method;
    use url::Url;

    fn ok_response() -> Response {
        Response::success(
            Url::parse("https://example.com/").unwrap(),
            Method::Get,
            200,
            Default::default(),
            Default::default(),
            String::new(),
            String::new(),
            Default::default(),
            serde_json::Value::Null,
            vec![],
            vec![],
            1024,
            Default::default(),
        )
    }

    #[tokio::test]
    async fn successful_response_increments_success_and_status_code() {
        let collector = StatsCollector::new(StatisticsLevel::Standard, Duration::from_secs(5), 100);
        collector.record_response(&ok_response(), Duration::from_millis(10)).await;
        let stats = collector.get_stats();
        assert_eq!(stats["requests"]["successful"], 1);
        assert_eq!(stats["status_codes"]["200"], 1);
    }

    #[tokio::test]
    async fn minimal_level_omits_performance_section() {
        let collector = StatsCollector::new(StatisticsLevel::Minimal, Duration::from_secs(5), 100);
        collector.record_response(&ok_response(), Duration::from_millis(10)).await;
        let stats = collector.get_stats();
        assert!(stats.get("performance").is_none());
    }

    #[tokio::test]
    async fn recent_errors_ring_is_bounded() {
        let collector = StatsCollector::new(StatisticsLevel::Standard, Duration::from_secs(5), 100);
        for _ in 0..(MAX_RECENT_ERRORS + 20) {
            collector.push_error(ErrorCategory::Network, "boom", None, None);
        }
        assert_eq!(collector.recent_errors.lock().unwrap().len(), MAX_RECENT_ERRORS);
    }
}
