//! `CookieMiddleware`: a per-host cookie jar, attaching stored cookies to
//! outgoing requests and capturing `Set-Cookie` headers from responses.
//!
//! Grounded in `original_source/.../crawler/middleware/cookie.py`. reqwest's
//! own cookie store is disabled on the shared client (see
//! `network::session::build_client`) so this middleware is the single
//! source of truth and stays inspectable via `Response.cookies`.

use std::collections::HashMap;

use reqwest::header::{COOKIE, SET_COOKIE};
use tokio::sync::Mutex;

use crate::core::request::RequestParts;
use crate::core::response::Response;
use crate::error::CrawlError;

use super::Middleware;

#[derive(Default)]
pub struct CookieMiddleware {
    jar: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl CookieMiddleware {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Middleware for CookieMiddleware {
    async fn pre_request(&self, request: &mut RequestParts) -> Result<(), CrawlError> {
        let Some(host) = request.url.host_str().map(str::to_string) else {
            return Ok(());
        };
        let jar = self.jar.lock().await;
        if let Some(cookies) = jar.get(&host) {
            for (name, value) in cookies {
                request.cookies.insert(name.clone(), value.clone());
            }
            if !cookies.is_empty() {
                let header_value = cookies
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                if let Ok(value) = header_value.parse() {
                    request.headers.insert(COOKIE, value);
                }
            }
        }
        Ok(())
    }

    async fn process_response(
        &self,
        request: &RequestParts,
        response: &mut Response,
    ) -> Result<(), CrawlError> {
        let Some(host) = request.url.host_str().map(str::to_string) else {
            return Ok(());
        };
        let mut new_cookies = HashMap::new();
        for value in response.headers.get_all(SET_COOKIE).iter() {
            if let Ok(text) = value.to_str() {
                if let Some((name, rest)) = text.split_once('=') {
                    let value = rest.split(';').next().unwrap_or("").trim();
                    new_cookies.insert(name.trim().to_string(), value.to_string());
                }
            }
        }
        if new_cookies.is_empty() {
            return Ok(());
        }
        response.cookies.extend(new_cookies.clone());
        self.jar
            .lock()
            .await
            .entry(host)
            .or_default()
            .extend(new_cookies);
        Ok(())
    }
}
