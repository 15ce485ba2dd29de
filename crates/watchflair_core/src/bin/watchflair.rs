/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use watchflair_core::config::{default_config_path, load_config};
use watchflair_core::fetch::{HttpFetcher, PageFetcher};
use watchflair_core::page_context::PageSnapshot;
use watchflair_core::relation_cache::RelationshipCache;
use watchflair_core::runtime::annotate_page;
use watchflair_core::store::SqliteStore;

const USAGE: &str = "usage: watchflair [--config PATH] [--html FILE] [--out FILE] <page-url>";

struct Args {
    config: Option<PathBuf>,
    html: Option<PathBuf>,
    out: Option<PathBuf>,
    url: String,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut html = None;
    let mut out = None;
    let mut url = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().context("--config requires a path")?)),
            "--html" => html = Some(PathBuf::from(args.next().context("--html requires a file")?)),
            "--out" => out = Some(PathBuf::from(args.next().context("--out requires a file")?)),
            "-h" | "--help" => bail!(USAGE),
            _ if url.is_none() => url = Some(arg),
            _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
        }
    }
    let url = url.filter(|u| !u.trim().is_empty()).context(USAGE)?;
    Ok(Args { config, html, out, url })
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().context("log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let cfg_path = match args.config {
        Some(p) => p,
        None => default_config_path()?,
    };
    info!("config: {}", cfg_path.display());
    let cfg = load_config(&cfg_path)?;

    let data_dir = cfg.data_dir()?;
    let store = Arc::new(SqliteStore::open(data_dir.join("watchflair.db"))?);
    info!("data dir: {}", data_dir.display());

    let fetcher = Arc::new(HttpFetcher::new(
        &cfg.base_url(),
        &cfg.user_agent(),
        cfg.cookie(),
        cfg.request_timeout(),
    )?);

    let markup = match &args.html {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
        None => fetcher.fetch_text(&args.url).await?,
    };
    let page = PageSnapshot::parse(&args.url, &markup);

    let cache = RelationshipCache::new(store, fetcher.clone()).with_max_watchlist_pages(cfg.max_watchlist_pages());
    let (page, report) = annotate_page(&cache, cfg.markers()?, cfg.refresh_policy(), page, now_ms()).await?;

    info!("report: {}", serde_json::to_string(&report)?);
    info!("net: {}", serde_json::to_string(&fetcher.metrics().snapshot())?);

    let html = page.html();
    match &args.out {
        Some(path) => {
            std::fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
            info!("annotated page written to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}
