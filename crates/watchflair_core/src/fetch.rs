/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::net_metrics::NetMetrics;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Returns the markup served at a site-relative path (or absolute URL).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, path: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
    user_agent: String,
    cookie: Option<String>,
    metrics: Arc<NetMetrics>,
}

impl HttpFetcher {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        cookie: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base url: {base_url}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base,
            user_agent: user_agent.to_string(),
            cookie: cookie.filter(|c| !c.trim().is_empty()),
            metrics: Arc::new(NetMetrics::new()),
        })
    }

    pub fn metrics(&self) -> Arc<NetMetrics> {
        self.metrics.clone()
    }

    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("invalid path: {path}"))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        let url = self.resolve(path)?;
        let mut req = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html")
            .header(USER_AGENT, &self.user_agent);
        if let Some(cookie) = &self.cookie {
            req = req.header(COOKIE, cookie);
        }
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    self.metrics.http_timeout(format!("GET {url}: {e}"));
                } else {
                    self.metrics.http_error(format!("GET {url}: {e}"));
                }
                return Err(anyhow!(e).context(format!("GET {url}")));
            }
        };
        let status = resp.status();
        if !status.is_success() {
            self.metrics.http_error(format!("GET {url}: {status}"));
            bail!("GET {url}: {status}");
        }
        let text = resp.text().await.with_context(|| format!("read body: {url}"))?;
        self.metrics.page_fetched(text.len() as u64);
        debug!("fetched {url} ({} bytes)", text.len());
        Ok(text)
    }
}

/// In-memory fetcher that replays captured pages and records every requested path.
/// Unknown paths are served as an empty body; paths marked failing return an error.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    failing: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, path: &str, body: &str) -> Self {
        self.pages.insert(path.to_string(), body.to_string());
        self
    }

    pub fn with_failure(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        if let Ok(mut g) = self.requests.lock() {
            g.push(path.to_string());
        }
        if self.failing.iter().any(|p| p == path) {
            bail!("GET {path}: 503 Service Unavailable");
        }
        Ok(self.pages.get(path).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let f = HttpFetcher::new(
            "https://www.furaffinity.net",
            "watchflair-test",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            f.resolve("/watchlist/to/alice/2/").unwrap().as_str(),
            "https://www.furaffinity.net/watchlist/to/alice/2/"
        );
        assert_eq!(
            f.resolve("https://example.org/x").unwrap().as_str(),
            "https://example.org/x"
        );
    }

    #[tokio::test]
    async fn static_fetcher_records_requests() {
        let f = StaticFetcher::new()
            .with_page("/a/", "<p>a</p>")
            .with_failure("/down/");
        assert_eq!(f.fetch_text("/a/").await.unwrap(), "<p>a</p>");
        assert_eq!(f.fetch_text("/missing/").await.unwrap(), "");
        assert!(f.fetch_text("/down/").await.is_err());
        assert_eq!(f.requests(), vec!["/a/", "/missing/", "/down/"]);
    }
}
