//! Web scraper collaborator.
//!
//! The fill pipeline asks a [`Scraper`] for a title, description, credits or
//! date when the sidecar leaves a group empty. Backends live outside this
//! crate; [`NoopScraper`] is the default and only serves cookies from a
//! Netscape `cookies.txt` file when one is configured.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use log::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Kind of value requested from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebClass {
    Title,
    Description,
    Credits,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

pub trait Scraper: Send + Sync {
    /// Tries `try_urls` in order and returns the first value found.
    fn fetch(&self, try_urls: &[String], class: WebClass) -> CoreResult<Option<String>>;

    /// Cookies applicable to `url`.
    fn get_cookies(&self, url: &str) -> Vec<Cookie>;
}

/// Never finds anything; optionally serves cookies from a file.
#[derive(Debug, Default)]
pub struct NoopScraper {
    cookies: Vec<Cookie>,
}

impl NoopScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads cookies from a Netscape-format cookie file.
    pub fn with_cookie_file(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read cookie file '{}': {e}", path.display()))
        })?;
        let cookies = parse_netscape_cookies(&text);
        debug!("Loaded {} cookies from {}", cookies.len(), path.display());
        Ok(Self { cookies })
    }
}

impl Scraper for NoopScraper {
    fn fetch(&self, try_urls: &[String], class: WebClass) -> CoreResult<Option<String>> {
        debug!(
            "No scraper backend configured, skipping {:?} lookup over {} URLs",
            class,
            try_urls.len()
        );
        Ok(None)
    }

    fn get_cookies(&self, url: &str) -> Vec<Cookie> {
        let Some(host) = host_of(url) else {
            return Vec::new();
        };
        self.cookies
            .iter()
            .filter(|c| domain_matches(&c.domain, host))
            .cloned()
            .collect()
    }
}

/// Parses `cookies.txt` lines: domain, subdomains flag, path, secure,
/// expiry, name, value (tab separated). `#HttpOnly_` prefixes are kept as
/// plain cookies.
pub fn parse_netscape_cookies(text: &str) -> Vec<Cookie> {
    text.lines()
        .filter_map(|line| {
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 7 {
                warn!("Skipping malformed cookie line");
                return None;
            }
            Some(Cookie {
                domain: parts[0].trim_start_matches('.').to_ascii_lowercase(),
                path: parts[2].to_string(),
                secure: parts[3].eq_ignore_ascii_case("TRUE"),
                name: parts[5].to_string(),
                value: parts[6].to_string(),
            })
        })
        .collect()
}

/// Host part of an `http(s)://` URL.
pub fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == cookie_domain || host.ends_with(&format!(".{cookie_domain}"))
}

// ============================================================================
// TEST DOUBLE
// ============================================================================

/// Returns canned answers per class and records every request.
#[derive(Debug, Default)]
pub struct MockScraper {
    answers: Vec<(WebClass, String)>,
    calls: Mutex<Vec<(WebClass, Vec<String>)>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, class: WebClass, value: impl Into<String>) -> Self {
        self.answers.push((class, value.into()));
        self
    }

    pub fn calls(&self) -> Vec<(WebClass, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Scraper for MockScraper {
    fn fetch(&self, try_urls: &[String], class: WebClass) -> CoreResult<Option<String>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((class, try_urls.to_vec()));
        }
        if try_urls.is_empty() {
            return Ok(None);
        }
        Ok(self
            .answers
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, v)| v.clone()))
    }

    fn get_cookies(&self, _url: &str) -> Vec<Cookie> {
        Vec::new()
    }
}
