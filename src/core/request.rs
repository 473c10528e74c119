//! `Request`: a pending HTTP request plus the parser callback that should
//! run against its eventual `Response`.
//!
//! The HTTP-relevant fields live in [`RequestParts`], a non-generic struct,
//! so the middleware chain (which has no reason to know about the parser's
//! item type) can operate on `&mut RequestParts` instead of on `Request<I>`
//! directly.

use std::collections::HashMap;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use url::Url;
use uuid::Uuid;

use crate::core::queueable::{DEFAULT_REQUEST_PRIORITY, Queueable};
use crate::core::response::Response;
use crate::core::yielded::Yielded;

/// HTTP method. Only GET and POST carry a body, matching the spec's data
/// model (`PUT`/`DELETE` exist for completeness but never serialize a body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A callback invoked with the dispatched `Request` and the `Response` it
/// produced, returning the (possibly nested) fan-out of follow-up work.
pub type Callback<I> = Arc<dyn Fn(Request<I>, Response) -> BoxFuture<'static, Vec<Yielded<I>>> + Send + Sync>;
pub type FailureCallback<I> = Callback<I>;

/// The HTTP-transport-relevant parts of a `Request`. Cloned whenever a
/// `Request` is cloned for retry/re-enqueue.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub id: Uuid,
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub params: Option<Vec<(String, String)>>,
    pub data: Option<Bytes>,
    pub json_data: Option<serde_json::Value>,
    pub encoding: Option<String>,
    pub timeout: Duration,
    pub max_content_length: usize,
    /// Chain of URLs leading to this request; `len() == crawl depth`.
    pub history: Vec<Url>,
    pub delay: Duration,
    pub max_retries: u32,
    pub num_retries: u32,
    pub should_retry: bool,
    pub has_run: bool,
    pub cookies: HashMap<String, String>,
    pub cb_kwargs: HashMap<String, serde_json::Value>,
    pub priority: i32,
}

impl RequestParts {
    pub fn new(url: Url, method: Method) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            method,
            headers: HeaderMap::new(),
            params: None,
            data: None,
            json_data: None,
            encoding: None,
            timeout: Duration::from_secs(5),
            max_content_length: 10 * 1024 * 1024,
            history: Vec::new(),
            delay: Duration::ZERO,
            max_retries: 3,
            num_retries: 0,
            should_retry: false,
            has_run: false,
            cookies: HashMap::new(),
            cb_kwargs: HashMap::new(),
            priority: DEFAULT_REQUEST_PRIORITY,
        }
    }

    /// Mark the request for retry with linear backoff, per the downloader
    /// algorithm: `delay = num_retries * 1s`. No-op past `max_retries`.
    pub fn set_retry(&mut self) {
        if self.num_retries < self.max_retries {
            self.should_retry = true;
            self.num_retries += 1;
            self.delay = Duration::from_secs(self.num_retries as u64);
        }
    }

    pub fn depth(&self) -> usize {
        self.history.len()
    }
}

pub struct Request<I> {
    pub parts: RequestParts,
    pub callback: Option<Callback<I>>,
    pub failure_callback: Option<FailureCallback<I>>,
}

impl<I> Request<I> {
    pub fn new(url: Url, method: Method) -> Self {
        Self {
            parts: RequestParts::new(url, method),
            callback: None,
            failure_callback: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(url, Method::Get)
    }

    pub fn with_callback(mut self, callback: Callback<I>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_failure_callback(mut self, callback: FailureCallback<I>) -> Self {
        self.failure_callback = Some(callback);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.parts.priority = priority;
        self
    }

    pub fn with_cb_kwargs(mut self, kwargs: HashMap<String, serde_json::Value>) -> Self {
        self.parts.cb_kwargs = kwargs;
        self
    }
}

impl<I> Clone for Request<I> {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
            callback: self.callback.clone(),
            failure_callback: self.failure_callback.clone(),
        }
    }
}

impl<I> Deref for Request<I> {
    type Target = RequestParts;
    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl<I> DerefMut for Request<I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

impl<I> Queueable for Request<I> {
    fn priority(&self) -> i32 {
        self.parts.priority
    }
}

impl<I> std::fmt::Debug for Request<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.parts.url)
            .field("method", &self.parts.method)
            .field("priority", &self.parts.priority)
            .field("depth", &self.parts.depth())
            .finish()
    }
}
