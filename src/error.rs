//! Crate-wide error type and the categorization used by the downloader,
//! middleware chain and statistics collector.

use thiserror::Error;

/// The kind of failure behind a synthesized [`crate::core::response::Response`].
///
/// Mirrors the `error_type` enum from the data model: `None` on the
/// `Response` means the fetch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    DnsFailure,
    ConnectionError,
    SslError,
    HttpError,
    Timeout,
    InvalidUrl,
    Cancelled,
    Other,
}

impl ErrorType {
    /// Map to the coarser category the statistics collector buckets errors into.
    pub fn category(&self, status_code: u16) -> ErrorCategory {
        match self {
            ErrorType::DnsFailure | ErrorType::ConnectionError | ErrorType::SslError => {
                ErrorCategory::Network
            }
            ErrorType::Timeout => ErrorCategory::Timeout,
            ErrorType::HttpError if (400..500).contains(&status_code) => ErrorCategory::HttpClient,
            ErrorType::HttpError => ErrorCategory::HttpServer,
            ErrorType::InvalidUrl => ErrorCategory::Validation,
            ErrorType::Cancelled => ErrorCategory::Other,
            ErrorType::Other => ErrorCategory::Other,
        }
    }
}

/// Coarse error bucket reported in `get_stats().errors.by_category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Timeout,
    HttpClient,
    HttpServer,
    Parsing,
    Validation,
    Robots,
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::HttpClient => "http_client",
            ErrorCategory::HttpServer => "http_server",
            ErrorCategory::Parsing => "parsing",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Robots => "robots",
            ErrorCategory::Other => "other",
        }
    }
}

/// Crate-wide error type. Library code returns `Result<T, CrawlError>`;
/// `anyhow::Error` is reserved for the binary/example boundary.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("blocked by robots.txt: {0}")]
    BlockedByRobots(String),

    #[error("request exceeded max_content_length ({0} bytes)")]
    ContentTooLarge(usize),

    #[error("request timed out")]
    Timeout,

    #[error("request was cancelled")]
    Cancelled,

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("max crawl depth reached")]
    MaxDepthReached,

    #[error("domain not in allow-list")]
    DomainNotAllowed,

    #[error("scheme not in allow-list")]
    SchemeNotAllowed,

    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    /// Whether this error, seen by a middleware, should cause the response
    /// to be kept but marked for retry by the downloader. Union of the
    /// downloader's own synthetic-timeout set (408, 429, 503) and
    /// `RetryMiddleware`'s server-error set (429, 500, 502, 503, 504).
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
    }
}
