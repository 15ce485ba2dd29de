/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct NetMetrics {
    pub pages_fetched: AtomicU64,
    pub rx_bytes: AtomicU64,
    pub http_errors: AtomicU64,
    pub http_timeouts: AtomicU64,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetMetricsSnapshot {
    pub pages_fetched: u64,
    pub rx_bytes: u64,
    pub http_errors: u64,
    pub http_timeouts: u64,
    pub last_error: Option<String>,
}

impl NetMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_fetched(&self, bytes: u64) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn http_error(&self, err: String) {
        self.http_errors.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut g) = self.last_error.lock() {
            *g = Some(err);
        }
    }

    pub fn http_timeout(&self, err: String) {
        self.http_timeouts.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut g) = self.last_error.lock() {
            *g = Some(err);
        }
    }

    pub fn snapshot(&self) -> NetMetricsSnapshot {
        NetMetricsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
            http_timeouts: self.http_timeouts.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|g| g.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = NetMetrics::new();
        m.page_fetched(100);
        m.page_fetched(23);
        m.http_error("GET /x: 500".to_string());
        m.http_timeout("GET /y: timed out".to_string());
        let s = m.snapshot();
        assert_eq!(s.pages_fetched, 2);
        assert_eq!(s.rx_bytes, 123);
        assert_eq!(s.http_errors, 1);
        assert_eq!(s.http_timeouts, 1);
        assert_eq!(s.last_error.as_deref(), Some("GET /y: timed out"));
    }
}
