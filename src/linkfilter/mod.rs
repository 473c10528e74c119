//! Classifies a discovered `<a>`/`<link>` tag as worth following (and at
//! what priority) or not, grounded in
//! `original_source/.../feed_spider/link_filter.py` and its sibling
//! `regexes.py`.

use regex::Regex;
use url::Url;

const INVALID_FILETYPES: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "bmp", "mp4", "mp3", "mkv", "md", "css", "avi", "pdf", "js",
    "woff", "woff2", "svg", "ttf", "zip",
];

const INVALID_QUERYSTRING_KEYS: &[&str] = &["comment", "comments", "post", "view", "theme"];

const INVALID_URL_CONTENTS: &[&str] = &[
    "wp-includes",
    "wp-content",
    "wp-json",
    "xmlrpc",
    "wp-admin",
    "/amp/",
    "mailto:",
    "//font.",
];

const LOW_PRIORITY_URLS: &[&str] = &["/archive/", "/page/", "forum", "//cdn.", "video"];

const FEED_LINK_TYPES: &[&str] = &["application/json", "rss", "atom", "rdf"];

/// Priority for a `<link>` tag whose declared MIME type already announces
/// a feed format — the strongest possible signal, just behind `CallbackResult`.
pub const PRIORITY_DECLARED_FEED_TYPE: i32 = 2;
pub const PRIORITY_FEEDLIKE_URL: i32 = 3;
pub const PRIORITY_AUTHOR_PAGE: i32 = 4;
pub const PRIORITY_PODCAST_URL: i32 = 5;
const PRIORITY_DEFAULT: i32 = 100;
const PRIORITY_LOW_PENALTY: i32 = 2;

pub struct LinkFilter {
    full_crawl: bool,
    feedlike_regex: Regex,
    podcast_regex: Regex,
    author_regex: Regex,
    date_regex: Regex,
}

impl LinkFilter {
    pub fn new(full_crawl: bool) -> Self {
        Self {
            full_crawl,
            feedlike_regex: Regex::new(r"(?i)\b(rss|feeds?|atom|json|xml|rdf|blogs?|subscribe)\b")
                .expect("feedlike regex is valid"),
            podcast_regex: Regex::new(r"(?i)\b(podcasts?)\b").expect("podcast regex is valid"),
            author_regex: Regex::new(r"(?i)\b(authors?|journalists?|writers?|contributors?)\b")
                .expect("author regex is valid"),
            date_regex: Regex::new(r"\b\d{4}/\d{2}\b").expect("date regex is valid"),
        }
    }

    /// Resolves `href` against `base`, classifies it, and returns the
    /// follow-worthy URL plus its priority, or `None` if it should be
    /// dropped. A `link_type` of e.g. `"application/rss+xml"` short-circuits
    /// straight to the highest non-callback priority.
    pub fn classify(&self, base: &Url, href: &str, link_type: Option<&str>) -> Option<(Url, i32)> {
        if href.is_empty() {
            return None;
        }
        let url = base.join(href).ok()?;
        let url_string = url.as_str();

        if let Some(link_type) = link_type {
            let lower = link_type.to_ascii_lowercase();
            if !lower.contains("json+oembed") && FEED_LINK_TYPES.iter().any(|t| lower.contains(t)) {
                return Some((url, PRIORITY_DECLARED_FEED_TYPE));
            }
        }

        let is_feedlike_href = self.feedlike_regex.is_match(url_string);
        let is_feedlike_query = self.query_matches(&url, &self.feedlike_regex);
        let is_feedlike_url = is_feedlike_href || is_feedlike_query;

        let is_podcast_href = self.podcast_regex.is_match(url_string);
        let is_podcast_query = self.query_matches(&url, &self.podcast_regex);
        let is_podcast_url = is_podcast_href || is_podcast_query;

        if !self.full_crawl && !is_feedlike_url && !is_podcast_url {
            return None;
        }

        let has_author_info = self.author_regex.is_match(href);
        let is_low_priority = self.is_low_priority(url_string);

        let mut priority = PRIORITY_DEFAULT;
        if is_low_priority {
            priority += PRIORITY_LOW_PENALTY;
        }
        if is_podcast_url {
            priority = PRIORITY_PODCAST_URL;
        }
        if has_author_info {
            priority = PRIORITY_AUTHOR_PAGE;
        }
        if is_feedlike_url {
            priority = PRIORITY_FEEDLIKE_URL;
        }

        let followable = !self.has_invalid_contents(href)
            && self.is_valid_filetype(url_string)
            && !self.has_invalid_querystring(&url);

        if followable && (self.full_crawl || is_feedlike_url || is_podcast_href) {
            let mut url = url;
            if !is_feedlike_query {
                url.set_query(None);
            }
            return Some((url, priority));
        }

        None
    }

    fn query_matches(&self, url: &Url, regex: &Regex) -> bool {
        url.query_pairs().any(|(key, _)| regex.is_match(&key))
    }

    fn is_valid_filetype(&self, url_string: &str) -> bool {
        let path = url_string.split(['?', '#']).next().unwrap_or(url_string);
        let last_segment = path.rsplit('/').next().unwrap_or("");
        let Some((_, suffix)) = last_segment.rsplit_once('.') else {
            return true;
        };
        !INVALID_FILETYPES.iter().any(|ext| ext.eq_ignore_ascii_case(suffix))
    }

    fn has_invalid_querystring(&self, url: &Url) -> bool {
        url.query_pairs()
            .any(|(key, _)| INVALID_QUERYSTRING_KEYS.iter().any(|bad| bad.eq_ignore_ascii_case(&key)))
    }

    fn has_invalid_contents(&self, href: &str) -> bool {
        let lower = href.to_ascii_lowercase();
        INVALID_URL_CONTENTS.iter().any(|bad| lower.contains(bad))
    }

    fn is_low_priority(&self, url_string: &str) -> bool {
        let lower = url_string.to_ascii_lowercase();
        if LOW_PRIORITY_URLS.iter().any(|needle| lower.contains(needle)) {
            return true;
        }
        self.date_regex.is_match(url_string)
    }
}
