//! `RobotsMiddleware`: lazily fetches and caches `robots.txt` per host,
//! blocking disallowed requests. Permissive on any fetch failure.
//!
//! Grounded in `original_source/.../crawler/middleware/robots.py`, with the
//! `Allow`/`Disallow`/`Crawl-delay` line parsing in the style of the
//! teacher's `network/robots.rs::parse_robots_txt`.

use std::collections::HashMap;

use tokio::sync::Mutex;
use url::Url;

use crate::core::request::RequestParts;
use crate::error::CrawlError;

use super::Middleware;

#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// `None` means no matching rule was found; caller should treat as allowed.
    disallow_paths: Vec<String>,
    allow_paths: Vec<String>,
    /// User-agent crawl-delay, if any.
    pub crawl_delay: Option<std::time::Duration>,
    pub sitemaps: Vec<String>,
}

impl RobotsRules {
    fn permits(&self, path: &str) -> bool {
        let best_disallow = self
            .disallow_paths
            .iter()
            .filter(|p| path.starts_with(p.as_str()))
            .map(|p| p.len())
            .max();
        let Some(disallow_len) = best_disallow else {
            return true;
        };
        let best_allow = self
            .allow_paths
            .iter()
            .filter(|p| path.starts_with(p.as_str()))
            .map(|p| p.len())
            .max()
            .unwrap_or(0);
        best_allow >= disallow_len
    }
}

/// Parse a `robots.txt` body, collecting the wildcard (`User-agent: *`)
/// section's rules plus any `Sitemap:` directives (which apply regardless
/// of user-agent section, per the spec).
pub fn parse_robots_txt(body: &str) -> RobotsRules {
    let mut rules = RobotsRules::default();
    let mut in_wildcard_section = false;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let lower = line.to_ascii_lowercase();

        if let Some(rest) = lower.strip_prefix("sitemap:") {
            let original = line[line.len() - rest.len()..].trim().to_string();
            rules.sitemaps.push(original);
            continue;
        }

        if let Some(agent) = lower.strip_prefix("user-agent:") {
            in_wildcard_section = agent.trim() == "*";
            continue;
        }

        if !in_wildcard_section {
            continue;
        }

        if let Some(path) = lower.strip_prefix("disallow:") {
            let path = path.trim();
            if !path.is_empty() {
                rules.disallow_paths.push(path.to_string());
            }
        } else if let Some(path) = lower.strip_prefix("allow:") {
            let path = path.trim();
            if !path.is_empty() {
                rules.allow_paths.push(path.to_string());
            }
        } else if let Some(delay) = lower.strip_prefix("crawl-delay:") {
            if let Ok(seconds) = delay.trim().parse::<f64>() {
                rules.crawl_delay = Some(std::time::Duration::from_secs_f64(seconds));
            }
        }
    }

    rules
}

pub struct RobotsMiddleware {
    client: reqwest::Client,
    cache: Mutex<HashMap<String, RobotsRules>>,
}

impl RobotsMiddleware {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn rules_for_host(&self, url: &Url) -> RobotsRules {
        let Some(host) = url.host_str() else {
            return RobotsRules::default();
        };
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);

        if let Some(rules) = self.cache.lock().await.get(&robots_url) {
            return rules.clone();
        }

        let body = match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            _ => None,
        };

        let rules = body.map(|b| parse_robots_txt(&b)).unwrap_or_default();
        self.cache.lock().await.insert(robots_url, rules.clone());
        rules
    }
}

#[async_trait::async_trait]
impl Middleware for RobotsMiddleware {
    async fn process_request(&self, request: &mut RequestParts) -> Result<(), CrawlError> {
        let rules = self.rules_for_host(&request.url).await;
        if !rules.permits(request.url.path()) {
            return Err(CrawlError::BlockedByRobots(request.url.to_string()));
        }
        if let Some(crawl_delay) = rules.crawl_delay {
            if crawl_delay > request.delay {
                request.delay = crawl_delay;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallow_blocks_matching_path() {
        let rules = parse_robots_txt("User-agent: *\nDisallow: /private\n");
        assert!(!rules.permits("/private/page"));
    }

    #[test]
    fn allow_overrides_narrower_disallow() {
        let rules =
            parse_robots_txt("User-agent: *\nDisallow: /private\nAllow: /private/public\n");
        assert!(rules.permits("/private/public/page"));
        assert!(!rules.permits("/private/secret"));
    }

    #[test]
    fn unmatched_path_is_allowed() {
        let rules = parse_robots_txt("User-agent: *\nDisallow: /private\n");
        assert!(rules.permits("/public"));
    }

    #[test]
    fn sitemap_directives_are_collected_regardless_of_user_agent_section() {
        let rules =
            parse_robots_txt("Sitemap: https://example.com/sitemap.xml\nUser-agent: *\nDisallow: /x\n");
        assert_eq!(rules.sitemaps, vec!["https://example.com/sitemap.xml"]);
    }

    #[test]
    fn crawl_delay_is_parsed_as_a_duration() {
        let rules = parse_robots_txt("User-agent: *\nCrawl-delay: 2\n");
        assert_eq!(rules.crawl_delay, Some(std::time::Duration::from_secs(2)));
    }

    #[test]
    fn other_user_agent_sections_are_ignored() {
        let rules = parse_robots_txt("User-agent: Googlebot\nDisallow: /\n");
        assert!(rules.permits("/anything"));
    }
}
