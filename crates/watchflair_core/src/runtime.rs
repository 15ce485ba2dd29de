/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::annotate::{AnnotatedPage, Markers};
use crate::config::RefreshPolicy;
use crate::page_context::PageSnapshot;
use crate::relation_cache::RelationshipCache;
use anyhow::Result;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};
use watchflair_protocol::{AnnotationReport, PassReport, RelationKind};

/// Annotates one loaded page.
///
/// Both relationship lookups run concurrently and each pass is rendered as soon as its own
/// lookup completes. A failed lookup leaves its pass unapplied without affecting the other.
/// The returned future is not `Send` since it owns the parsed document.
pub async fn annotate_page(
    cache: &RelationshipCache,
    markers: Markers,
    policy: RefreshPolicy,
    page: PageSnapshot,
    now_ms: i64,
) -> Result<(AnnotatedPage, AnnotationReport)> {
    let mut page = AnnotatedPage::new(page, markers)?;
    let mut report = AnnotationReport::new(page.context());

    let Some(active) = page.active_user() else {
        info!("no logged-in user on this page, nothing to annotate");
        return Ok((page, report));
    };
    report.active_user = Some(active.to_string());

    let lookup = |kind: RelationKind| {
        let active = active.clone();
        let window = match kind {
            RelationKind::Watchers => policy.watchers,
            RelationKind::Blocked => policy.blocked,
        };
        async move { (kind, cache.get_or_refresh(kind, &active, now_ms, window).await) }
    };
    let mut pending: FuturesUnordered<_> = [RelationKind::Watchers, RelationKind::Blocked]
        .into_iter()
        .map(lookup)
        .collect();

    while let Some((kind, result)) = pending.next().await {
        let pass = match kind {
            RelationKind::Watchers => &mut report.watchers,
            RelationKind::Blocked => &mut report.blocked,
        };
        let list = match result {
            Ok(list) => list,
            Err(e) => {
                warn!("could not load {} of {active}: {e:#}", kind.key_segment());
                pass.error = Some(format!("{e:#}"));
                continue;
            }
        };
        pass.list_size = list.members.len();
        let members = list.member_set();
        let applied = match kind {
            RelationKind::Watchers => {
                info!("There are {} users watching {active}", members.len());
                page.apply_watchers(&members, &active)
            }
            RelationKind::Blocked => page.apply_blocked(&members, &active),
        };
        record(pass, applied, kind);
    }

    Ok((page, report))
}

fn record(pass: &mut PassReport, applied: Result<Option<usize>>, kind: RelationKind) {
    match applied {
        Ok(Some(n)) => {
            pass.applied = true;
            pass.marked = n;
        }
        Ok(None) => {}
        Err(e) => {
            warn!("{} pass failed: {e:#}", kind.key_segment());
            pass.error = Some(format!("{e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::store::{KvStore, MemoryStore};
    use std::sync::Arc;
    use watchflair_protocol::{PageType, Theme};

    const NOW: i64 = 1_700_000_000_000;

    fn view_page() -> PageSnapshot {
        PageSnapshot::parse(
            "https://www.furaffinity.net/view/9/",
            r#"<html><body data-static-path="/themes/beta">
               <a id="my-username" href="/user/bob/">Bob</a>
               <div class="comment_container"><a class="comment_anchor"></a>
                 <div class="cell"><a class="inline" href="/user/alice/">alice</a><span>alice</span></div></div>
               <div class="comment_container"><a class="comment_anchor"></a>
                 <div class="cell"><a class="inline" href="/user/dave/">dave</a><span>dave</span></div></div>
               </body></html>"#,
        )
    }

    fn watchlist(names: &[&str]) -> String {
        let links: String = names
            .iter()
            .map(|n| format!(r#"<a href="/user/{n}/">{n}</a>"#))
            .collect();
        format!(r#"<html><body><div class="watch-list-items">{links}</div></body></html>"#)
    }

    fn settings(blocked: &str) -> String {
        format!(r#"<html><body><textarea name="blocklist">{blocked}</textarea></body></html>"#)
    }

    #[tokio::test]
    async fn both_passes_apply() {
        let fetcher = StaticFetcher::new()
            .with_page("/watchlist/to/bob/", &watchlist(&["alice", "carol"]))
            .with_page("/controls/profile/", &settings("dave"));
        let cache = RelationshipCache::new(Arc::new(MemoryStore::new()), Arc::new(fetcher));
        let (page, report) = annotate_page(&cache, Markers::default(), RefreshPolicy::default(), view_page(), NOW)
            .await
            .unwrap();
        assert_eq!(
            report.context,
            watchflair_protocol::PageContext {
                theme: Theme::Modern,
                page_type: PageType::Other
            }
        );
        assert_eq!(report.active_user.as_deref(), Some("bob"));
        assert!(report.watchers.applied);
        assert_eq!(report.watchers.list_size, 2);
        assert_eq!(report.watchers.marked, 1);
        assert!(report.blocked.applied);
        assert_eq!(report.blocked.marked, 1);
        let html = page.html();
        assert!(html.contains("<span>alice</span> <span class=\"font-small\">"));
        assert!(html.contains("<span class=\"watchflair-blocked\" style=\"color: #808080;\">dave</span>"));
    }

    #[tokio::test]
    async fn blocked_failure_does_not_stop_watchers() {
        let fetcher = StaticFetcher::new()
            .with_page("/watchlist/to/bob/", &watchlist(&["alice"]))
            .with_failure("/controls/profile/");
        let cache = RelationshipCache::new(Arc::new(MemoryStore::new()), Arc::new(fetcher));
        let (page, report) = annotate_page(&cache, Markers::default(), RefreshPolicy::default(), view_page(), NOW)
            .await
            .unwrap();
        assert!(report.watchers.applied);
        assert_eq!(report.watchers.marked, 1);
        assert!(!report.blocked.applied);
        assert!(report.blocked.error.is_some());
        assert!(!page.html().contains("watchflair-blocked"));
    }

    #[tokio::test]
    async fn anonymous_page_is_untouched() {
        let fetcher = Arc::new(StaticFetcher::new());
        let cache = RelationshipCache::new(Arc::new(MemoryStore::new()), fetcher.clone());
        let page = PageSnapshot::parse("https://www.furaffinity.net/view/9/", "<html><body><p>hi</p></body></html>");
        let (page, report) = annotate_page(&cache, Markers::default(), RefreshPolicy::default(), page, NOW)
            .await
            .unwrap();
        assert!(report.active_user.is_none());
        assert!(!report.watchers.applied && !report.blocked.applied);
        assert!(fetcher.requests().is_empty());
        assert!(!page.html().contains("Watches You"));
    }

    #[tokio::test]
    async fn fresh_cache_serves_without_fetching() {
        let store = Arc::new(MemoryStore::new());
        store.set("bob.watchlist", "alice").await.unwrap();
        store.set("bob.watchlist.timeLastUpdated", &(NOW - 60_000).to_string()).await.unwrap();
        store.set("bob.blocklist", "dave").await.unwrap();
        store.set("bob.blocklist.timeLastUpdated", &(NOW - 60_000).to_string()).await.unwrap();
        let fetcher = Arc::new(StaticFetcher::new());
        let cache = RelationshipCache::new(store, fetcher.clone());
        let (_, report) = annotate_page(&cache, Markers::default(), RefreshPolicy::default(), view_page(), NOW)
            .await
            .unwrap();
        assert!(fetcher.requests().is_empty());
        assert_eq!(report.watchers.marked, 1);
        assert_eq!(report.blocked.marked, 1);
    }
}
