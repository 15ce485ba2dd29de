/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::dom::selector;
use crate::fetch::PageFetcher;
use crate::identity::Identity;
use crate::store::KvStore;
use anyhow::{bail, Context, Result};
use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use urlencoding::encode;
use watchflair_protocol::RelationKind;

pub const WATCHLIST_ANCHORS: &str = r#".watch-list-items a[href*="/user/"]"#;
pub const BLOCKLIST_FIELD: &str = r#"textarea[name="blocklist"], textarea#blocklist"#;
pub const DEFAULT_MAX_WATCHLIST_PAGES: u32 = 500;

/// One completed retrieval of a relationship set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationList {
    pub kind: RelationKind,
    pub owner: Identity,
    pub members: Vec<Identity>,
    pub last_refreshed_ms: i64,
}

impl RelationList {
    pub fn member_set(&self) -> HashSet<Identity> {
        self.members.iter().cloned().collect()
    }
}

pub fn members_key(kind: RelationKind, owner: &Identity) -> String {
    format!("{owner}.{}", kind.key_segment())
}

pub fn refreshed_key(kind: RelationKind, owner: &Identity) -> String {
    format!("{owner}.{}.timeLastUpdated", kind.key_segment())
}

pub fn serialize_members(members: &[Identity]) -> String {
    members
        .iter()
        .map(Identity::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_members(raw: &str) -> Vec<Identity> {
    raw.split(',').filter_map(Identity::from_display).collect()
}

/// True when nothing was stored yet, the interval has strictly elapsed, or the stored
/// timestamp lies in the future.
pub fn is_stale(last_refreshed_ms: Option<i64>, now_ms: i64, min_interval: Duration) -> bool {
    let Some(last) = last_refreshed_ms else {
        return true;
    };
    let elapsed = now_ms.saturating_sub(last);
    elapsed < 0 || elapsed as u128 > min_interval.as_millis()
}

/// Profile identities listed on one watchlist page, in document order.
pub fn parse_watchlist_page(markup: &str) -> Result<Vec<Identity>> {
    let doc = Html::parse_document(markup);
    let sel = selector(WATCHLIST_ANCHORS)?;
    Ok(doc
        .select(&sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(Identity::from_profile_link)
        .collect())
}

/// Entries of the blocklist text field on the profile settings page.
pub fn parse_blocklist_page(markup: &str) -> Result<Vec<Identity>> {
    let doc = Html::parse_document(markup);
    let sel = selector(BLOCKLIST_FIELD)?;
    let Some(field) = doc.select(&sel).next() else {
        bail!("blocklist field not found on settings page");
    };
    let text = field.text().collect::<String>();
    Ok(text
        .split(|c: char| c == '\n' || c == '\r' || c == ',')
        .filter_map(Identity::from_display)
        .collect())
}

fn dedup_in_order(members: Vec<Identity>) -> Vec<Identity> {
    let mut seen = HashSet::with_capacity(members.len());
    members.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

pub struct RelationshipCache {
    store: Arc<dyn KvStore>,
    fetcher: Arc<dyn PageFetcher>,
    max_watchlist_pages: u32,
}

impl RelationshipCache {
    pub fn new(store: Arc<dyn KvStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            max_watchlist_pages: DEFAULT_MAX_WATCHLIST_PAGES,
        }
    }

    pub fn with_max_watchlist_pages(mut self, pages: u32) -> Self {
        self.max_watchlist_pages = pages.max(1);
        self
    }

    pub async fn last_refreshed(&self, kind: RelationKind, owner: &Identity) -> Result<Option<i64>> {
        let raw = self.store.get(&refreshed_key(kind, owner)).await?;
        Ok(raw.and_then(|v| v.trim().parse::<i64>().ok()))
    }

    pub async fn should_refresh(
        &self,
        kind: RelationKind,
        owner: &Identity,
        now_ms: i64,
        min_interval: Duration,
    ) -> Result<bool> {
        let last = self.last_refreshed(kind, owner).await?;
        if let Some(last) = last {
            debug!(
                "{} of {owner} last updated {} minutes ago",
                kind.key_segment(),
                now_ms.saturating_sub(last) / 60_000
            );
        }
        Ok(is_stale(last, now_ms, min_interval))
    }

    /// Stored list, or `None` if absent or empty.
    pub async fn persisted(&self, kind: RelationKind, owner: &Identity) -> Result<Option<RelationList>> {
        let Some(raw) = self.store.get(&members_key(kind, owner)).await? else {
            return Ok(None);
        };
        let members = parse_members(&raw);
        if members.is_empty() {
            return Ok(None);
        }
        let last_refreshed_ms = self.last_refreshed(kind, owner).await?.unwrap_or_default();
        Ok(Some(RelationList {
            kind,
            owner: owner.clone(),
            members,
            last_refreshed_ms,
        }))
    }

    pub async fn retrieve(&self, kind: RelationKind, owner: &Identity) -> Result<RelationList> {
        self.retrieve_at(kind, owner, now_ms()).await
    }

    async fn retrieve_at(&self, kind: RelationKind, owner: &Identity, stamp_ms: i64) -> Result<RelationList> {
        let fetched = match kind {
            RelationKind::Watchers => self.fetch_watchlist(owner).await?,
            RelationKind::Blocked => self.fetch_blocklist().await?,
        };
        let members = dedup_in_order(fetched);

        self.store
            .set_many(&[
                (members_key(kind, owner), serialize_members(&members)),
                (refreshed_key(kind, owner), stamp_ms.to_string()),
            ])
            .await
            .with_context(|| format!("persist {} of {owner}", kind.key_segment()))?;
        info!(
            "updated locally-saved {} of {owner} ({} entries)",
            kind.key_segment(),
            members.len()
        );

        Ok(RelationList {
            kind,
            owner: owner.clone(),
            members,
            last_refreshed_ms: stamp_ms,
        })
    }

    pub async fn get_or_refresh(
        &self,
        kind: RelationKind,
        owner: &Identity,
        now_ms: i64,
        min_interval: Duration,
    ) -> Result<RelationList> {
        if self.should_refresh(kind, owner, now_ms, min_interval).await? {
            return self.retrieve_at(kind, owner, now_ms).await;
        }
        match self.persisted(kind, owner).await? {
            Some(list) => Ok(list),
            None => self.retrieve_at(kind, owner, now_ms).await,
        }
    }

    async fn fetch_watchlist(&self, owner: &Identity) -> Result<Vec<Identity>> {
        let owner_seg = encode(owner.as_str());
        let mut members = Vec::new();
        let mut page = 1u32;
        loop {
            let path = if page == 1 {
                format!("/watchlist/to/{owner_seg}/")
            } else {
                format!("/watchlist/to/{owner_seg}/{page}/")
            };
            let body = self
                .fetcher
                .fetch_text(&path)
                .await
                .with_context(|| format!("fetch watchlist page {page} of {owner}"))?;
            let found = parse_watchlist_page(&body)?;
            debug!("watchlist page {page} of {owner}: {} entries", found.len());
            if found.is_empty() {
                break;
            }
            // Page `max + 1` is only fetched to confirm the list ended.
            if page > self.max_watchlist_pages {
                bail!(
                    "watchlist of {owner} exceeds {} pages, refusing to persist",
                    self.max_watchlist_pages
                );
            }
            members.extend(found);
            page += 1;
        }
        Ok(members)
    }

    async fn fetch_blocklist(&self) -> Result<Vec<Identity>> {
        let body = self
            .fetcher
            .fetch_text("/controls/profile/")
            .await
            .context("fetch profile settings")?;
        parse_blocklist_page(&body)
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
