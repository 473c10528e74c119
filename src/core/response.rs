//! `Response`: the result of a single HTTP transaction, success or
//! synthesized failure.

use std::collections::HashMap;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use url::Url;
use uuid::Uuid;

use crate::core::request::Method;
use crate::error::ErrorType;

#[derive(Debug, Clone)]
pub struct Response {
    pub id: Uuid,
    pub url: Url,
    pub method: Method,
    pub status_code: u16,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub encoding: String,
    pub text: String,
    pub data: Bytes,
    pub json: serde_json::Value,
    /// Chain of URLs that led to this response, ending with the URL
    /// actually contacted.
    pub history: Vec<Url>,
    pub redirect_history: Vec<Url>,
    pub content_length: usize,
    pub error_type: Option<ErrorType>,
    /// Pass-through from the originating `Request`'s `cb_kwargs`.
    pub meta: HashMap<String, serde_json::Value>,
    /// Set by `RetryMiddleware` when the status is one of the retryable
    /// sentinels; the downloader re-enqueues the originating request if set.
    pub should_retry: bool,
}

impl Response {
    pub fn success(
        url: Url,
        method: Method,
        status_code: u16,
        headers: HeaderMap,
        cookies: HashMap<String, String>,
        encoding: String,
        text: String,
        data: Bytes,
        json: serde_json::Value,
        history: Vec<Url>,
        redirect_history: Vec<Url>,
        content_length: usize,
        meta: HashMap<String, serde_json::Value>,
    ) -> Self {
        let error_type = if status_code >= 400 {
            Some(ErrorType::HttpError)
        } else {
            None
        };
        Self {
            id: Uuid::new_v4(),
            url,
            method,
            status_code,
            headers,
            cookies,
            encoding,
            text,
            data,
            json,
            history,
            redirect_history,
            content_length,
            error_type,
            meta,
            should_retry: false,
        }
    }

    /// A synthesized failure response: no real bytes were read, the status
    /// code is one of the sentinels (408 timeout, 413 oversize, 499
    /// cancelled, 500 generic, 415 unacceptable content-type).
    pub fn failure(
        url: Url,
        method: Method,
        status_code: u16,
        history: Vec<Url>,
        error_type: ErrorType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            method,
            status_code,
            headers: HeaderMap::new(),
            cookies: HashMap::new(),
            encoding: String::new(),
            text: String::new(),
            data: Bytes::new(),
            json: serde_json::Value::Null,
            history,
            redirect_history: Vec::new(),
            content_length: 0,
            error_type: Some(error_type),
            meta: HashMap::new(),
            should_retry: false,
        }
    }

    /// `200 <= status_code <= 299`, or the `0` sentinel some internal
    /// callers use for "not a real HTTP exchange".
    pub fn ok(&self) -> bool {
        self.status_code == 0 || (200..=299).contains(&self.status_code)
    }

    pub fn origin(&self) -> String {
        match self.url.host_str() {
            Some(host) => format!("{}://{}", self.url.scheme(), host),
            None => String::new(),
        }
    }

    pub fn is_max_depth_reached(&self, max_depth: usize) -> bool {
        max_depth > 0 && self.history.len() >= max_depth
    }
}
