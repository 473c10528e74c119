//! URL canonicalization and the duplicate-filter fingerprint store.
//!
//! Grounded in `original_source/src/feedsearch_crawler/crawler/duplicatefilter.py`:
//! a SHA-1 fingerprint of the canonicalized URL (optionally salted with the
//! HTTP method), kept in a map guarded by a single lock.

use std::collections::HashSet;

use sha1::{Digest, Sha1};
use tokio::sync::Mutex;
use url::Url;

use crate::core::request::Method;

/// Query keys whose presence means "this is probably a feed URL, keep the
/// query string intact rather than stripping it before hashing".
const FEED_HINT_KEYS: &[&str] = &[
    "feed",
    "feedformat",
    "format",
    "rss",
    "atom",
    "jsonfeed",
    "podcast",
];

/// Normalize a URL + method into the string that gets hashed: lowercase
/// scheme and host, default ports elided, trailing dot on the host
/// stripped, and the query string either preserved (if it carries a feed
/// hint key) or dropped entirely (so `/?utm_source=x` and `/` collapse).
pub fn canonicalize(url: &Url) -> String {
    let mut normalized = url.clone();

    let _ = normalized.set_scheme(&normalized.scheme().to_ascii_lowercase());

    if let Some(host) = normalized.host_str() {
        let lower = host.to_ascii_lowercase();
        let trimmed = lower.trim_end_matches('.').to_string();
        let _ = normalized.set_host(Some(&trimmed));
    }

    let default_port = match normalized.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if normalized.port() == default_port {
        let _ = normalized.set_port(None);
    }

    let is_feedlike_query = normalized
        .query_pairs()
        .any(|(key, _)| FEED_HINT_KEYS.iter().any(|hint| key.eq_ignore_ascii_case(hint)));

    if !is_feedlike_query {
        normalized.set_query(None);
    }

    normalized.set_fragment(None);

    normalized.into()
}

/// Idempotent by construction: canonicalizing an already-canonical URL
/// string re-parses to the identical string (property 8 in the spec).
pub fn canonicalize_str(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| canonicalize(&u))
}

fn fingerprint(canonical_url: &str, method: Option<&Method>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(canonical_url.as_bytes());
    if let Some(method) = method {
        hasher.update(method.as_str().as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Filters duplicate URLs by a SHA-1 fingerprint of the canonicalized URL.
/// Never errors: contention is the only concern, handled by a short
/// critical section around the set.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    fingerprints: Mutex<HashSet<String>>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks whether the URL (optionally salted by method) has
    /// already been seen, inserting it if absent. Returns `true` if it was
    /// already present.
    pub async fn is_url_seen(&self, url: &Url, method: Option<&Method>) -> bool {
        let fp = fingerprint(&canonicalize(url), method);
        let mut seen = self.fingerprints.lock().await;
        if seen.contains(&fp) {
            true
        } else {
            seen.insert(fp);
            false
        }
    }

    pub async fn len(&self) -> usize {
        self.fingerprints.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_enqueue_of_same_url_is_seen() {
        let filter = DuplicateFilter::new();
        let url = Url::parse("https://example.com/feed").unwrap();
        assert!(!filter.is_url_seen(&url, None).await);
        assert!(filter.is_url_seen(&url, None).await);
    }

    #[tokio::test]
    async fn query_is_stripped_unless_feedlike() {
        let filter = DuplicateFilter::new();
        let a = Url::parse("https://example.com/feed").unwrap();
        let b = Url::parse("https://example.com/feed?utm_source=x").unwrap();
        assert!(!filter.is_url_seen(&a, None).await);
        // b collapses onto a because utm_source isn't a feed hint key.
        assert!(filter.is_url_seen(&b, None).await);
    }

    #[tokio::test]
    async fn feedlike_query_keeps_url_distinct() {
        let filter = DuplicateFilter::new();
        let a = Url::parse("https://example.com/feed").unwrap();
        let b = Url::parse("https://example.com/feed?format=rss").unwrap();
        assert!(!filter.is_url_seen(&a, None).await);
        assert!(!filter.is_url_seen(&b, None).await);
    }

    #[test]
    fn canonicalize_round_trips() {
        let url = Url::parse("HTTP://Example.COM:80/Path/?utm_source=x").unwrap();
        let once = canonicalize(&url);
        let twice = canonicalize_str(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn method_salt_distinguishes_get_and_post() {
        let filter = DuplicateFilter::new();
        let url = Url::parse("https://example.com/submit").unwrap();
        assert!(!filter.is_url_seen(&url, Some(&Method::Get)).await);
        assert!(!filter.is_url_seen(&url, Some(&Method::Post)).await);
    }
}
