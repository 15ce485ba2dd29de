/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - WatchFlair Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Flat string key-value persistence.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Writes all pairs or none of them.
    async fn set_many(&self, pairs: &[(String, String)]) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create data dir: {}", dir.display()))?;
            }
        }
        let conn = Connection::open(&path).with_context(|| format!("open db: {}", path.display()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS local_meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_local_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = Connection::open(&self.path)?;
        conn.query_row(
            "SELECT value FROM local_meta WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn set_local_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = Connection::open(&self.path)?;
        conn.execute(
            "INSERT OR REPLACE INTO local_meta(key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn set_local_meta_many(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut conn = Connection::open(&self.path)?;
        let tx = conn.transaction()?;
        for (key, value) in pairs {
            tx.execute(
                "INSERT OR REPLACE INTO local_meta(key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || db.get_local_meta(&key)).await?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || db.set_local_meta(&key, &value)).await?
    }

    async fn set_many(&self, pairs: &[(String, String)]) -> Result<()> {
        let db = self.clone();
        let pairs = pairs.to_vec();
        tokio::task::spawn_blocking(move || db.set_local_meta_many(&pairs)).await?
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut g = self.entries.write().await;
        for (key, value) in pairs {
            g.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> PathBuf {
        std::env::temp_dir()
            .join(format!("watchflair-test-{:016x}", rand::random::<u64>()))
            .join("store.db")
    }

    #[tokio::test]
    async fn sqlite_roundtrip() {
        let path = temp_db();
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("alice.watchlist").await.unwrap(), None);

        store.set("alice.watchlist", "bob,carol").await.unwrap();
        assert_eq!(
            store.get("alice.watchlist").await.unwrap().as_deref(),
            Some("bob,carol")
        );

        store
            .set_many(&[
                ("alice.watchlist".to_string(), "dave".to_string()),
                ("alice.watchlist.timeLastUpdated".to_string(), "42".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("alice.watchlist").await.unwrap().as_deref(), Some("dave"));
        assert_eq!(
            store.get("alice.watchlist.timeLastUpdated").await.unwrap().as_deref(),
            Some("42")
        );

        // Reopening keeps the data.
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("alice.watchlist").await.unwrap().as_deref(), Some("dave"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "1").await.unwrap();
        store
            .set_many(&[("k".to_string(), "2".to_string()), ("j".to_string(), "3".to_string())])
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("j").await.unwrap().as_deref(), Some("3"));
    }
}
