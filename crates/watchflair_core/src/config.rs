/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::annotate::{Markers, DEFAULT_BLOCKED_STYLE, WATCHER_HTML_CLASSIC, WATCHER_HTML_MODERN};
use crate::relation_cache::DEFAULT_MAX_WATCHLIST_PAGES;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.furaffinity.net";
pub const DEFAULT_USER_AGENT: &str = concat!("watchflair/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct WatchflairConfig {
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default, alias = "dataDir")]
    pub data_dir: Option<String>,

    /// Minimum age of the cached watcher list before it is fetched again. Default 5.
    #[serde(default, alias = "watchersRefreshMinutes")]
    pub watchers_refresh_minutes: Option<u64>,
    /// Default 60.
    #[serde(default, alias = "blockedRefreshMinutes")]
    pub blocked_refresh_minutes: Option<u64>,
    #[serde(default, alias = "maxWatchlistPages")]
    pub max_watchlist_pages: Option<u32>,

    #[serde(default, alias = "markerHtmlModern")]
    pub marker_html_modern: Option<String>,
    #[serde(default, alias = "markerHtmlClassic")]
    pub marker_html_classic: Option<String>,
    /// Inline CSS for links to blocked users.
    #[serde(default, alias = "blockedStyle")]
    pub blocked_style: Option<String>,

    /// Session cookie forwarded on every request. The watchlist and settings pages need it.
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default, alias = "userAgent")]
    pub user_agent: Option<String>,
    #[serde(default, alias = "requestTimeoutSecs")]
    pub request_timeout_secs: Option<u64>,
}

/// Refresh windows used for one annotation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub watchers: Duration,
    pub blocked: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            watchers: Duration::from_secs(5 * 60),
            blocked: Duration::from_secs(60 * 60),
        }
    }
}

impl WatchflairConfig {
    pub fn base_url(&self) -> String {
        non_empty(&self.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn user_agent(&self) -> String {
        non_empty(&self.user_agent).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    pub fn cookie(&self) -> Option<String> {
        non_empty(&self.cookie)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(20).clamp(1, 600))
    }

    pub fn max_watchlist_pages(&self) -> u32 {
        self.max_watchlist_pages
            .unwrap_or(DEFAULT_MAX_WATCHLIST_PAGES)
            .max(1)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        let d = RefreshPolicy::default();
        RefreshPolicy {
            watchers: self
                .watchers_refresh_minutes
                .map(minutes)
                .unwrap_or(d.watchers),
            blocked: self
                .blocked_refresh_minutes
                .map(minutes)
                .unwrap_or(d.blocked),
        }
    }

    pub fn markers(&self) -> Result<Markers> {
        Markers::new(
            self.marker_html_modern.as_deref().unwrap_or(WATCHER_HTML_MODERN),
            self.marker_html_classic.as_deref().unwrap_or(WATCHER_HTML_CLASSIC),
            self.blocked_style.as_deref().unwrap_or(DEFAULT_BLOCKED_STYLE),
        )
        .context("invalid marker config")
    }

    /// `WATCHFLAIR_DATA_DIR`, then `data_dir`, then the platform data dir.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Ok(v) = std::env::var("WATCHFLAIR_DATA_DIR") {
            return Ok(PathBuf::from(v));
        }
        if let Some(dir) = non_empty(&self.data_dir) {
            return Ok(PathBuf::from(dir));
        }
        default_data_dir()
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("net", "watchflair", "WatchFlair")
        .context("unable to determine platform data dir")?;
    Ok(proj.data_local_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(v) = std::env::var("WATCHFLAIR_CONFIG") {
        return Ok(PathBuf::from(v));
    }
    let proj = ProjectDirs::from("net", "watchflair", "WatchFlair")
        .context("unable to determine platform config dir")?;
    Ok(proj.config_dir().join("config.json"))
}

pub fn parse_config(text: &str) -> Result<WatchflairConfig> {
    if text.trim().is_empty() {
        return Ok(WatchflairConfig::default());
    }
    serde_json::from_str(text).context("parse config json")
}

/// Reads the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<WatchflairConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text).with_context(|| format!("config {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WatchflairConfig::default()),
        Err(e) => Err(e).with_context(|| format!("read config {}", path.display())),
    }
}
