/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::env;
use std::sync::Arc;
use watchflair_core::config::{default_config_path, load_config};
use watchflair_core::fetch::HttpFetcher;
use watchflair_core::identity::Identity;
use watchflair_core::relation_cache::RelationshipCache;
use watchflair_core::store::MemoryStore;
use watchflair_protocol::RelationKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let owner = env::args().nth(1).as_deref().and_then(Identity::from_display);
    let Some(owner) = owner else {
        anyhow::bail!("usage: dev_relations <owner>");
    };

    let cfg = load_config(&default_config_path()?)?;
    let fetcher = HttpFetcher::new(&cfg.base_url(), &cfg.user_agent(), cfg.cookie(), cfg.request_timeout())?;
    let metrics = fetcher.metrics();
    let cache = RelationshipCache::new(Arc::new(MemoryStore::new()), Arc::new(fetcher))
        .with_max_watchlist_pages(cfg.max_watchlist_pages());

    for kind in [RelationKind::Watchers, RelationKind::Blocked] {
        match cache.retrieve(kind, &owner).await {
            Ok(list) => {
                println!("{}={}", kind.key_segment(), list.members.len());
                for m in &list.members {
                    println!("  {m}");
                }
            }
            Err(e) => println!("{}: error: {e:#}", kind.key_segment()),
        }
    }
    let net = metrics.snapshot();
    println!("pages_fetched={} rx_bytes={}", net.pages_fetched, net.rx_bytes);
    Ok(())
}
