//! `ContentTypeMiddleware`: rejects responses whose `Content-Type` is
//! unacceptable for crawling (images, video, binary archives, fonts) before
//! the body is handed to a parser callback.
//!
//! Grounded in `original_source/.../crawler/middleware/content_type.py`,
//! which matched against a denylist of MIME-type prefixes rather than an
//! allowlist, since feed/HTML discovery sees far more content-type variety
//! than a feed format's own MIME type.

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::{CrawlError, ErrorType};

use super::Middleware;

const REJECTED_CONTENT_TYPE_PREFIXES: &[&str] = &[
    "image/",
    "video/",
    "audio/",
    "font/",
    "application/octet-stream",
    "application/zip",
    "application/pdf",
    "application/x-msdownload",
];

fn is_rejected(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    REJECTED_CONTENT_TYPE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

pub struct ContentTypeMiddleware;

impl ContentTypeMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContentTypeMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Middleware for ContentTypeMiddleware {
    async fn process_response(
        &self,
        _request: &RequestParts,
        response: &mut Response,
    ) -> Result<(), CrawlError> {
        let content_type = response
            .headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if is_rejected(content_type) {
            response.status_code = 415;
            response.error_type = Some(ErrorType::Other);
            response.text.clear();
            response.data = bytes::Bytes::new();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_content_type_is_rejected() {
        assert!(is_rejected("image/png"));
        assert!(is_rejected("IMAGE/JPEG"));
    }

    #[test]
    fn html_and_xml_are_accepted() {
        assert!(!is_rejected("text/html; charset=utf-8"));
        assert!(!is_rejected("application/rss+xml"));
        assert!(!is_rejected("application/json"));
    }
}
