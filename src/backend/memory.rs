//! In-memory storage backend.
//!
//! Keeps each table as a HashMap keyed by primary key. Nothing is persisted;
//! useful for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StorageBackend, TableSchema};
use crate::cache::CacheEntry;

type Table = HashMap<String, CacheEntry>;

/// In-process backend with HashMap tables.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Tables by name
    tables: RwLock<HashMap<String, Table>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in `table`, stale ones included.
    pub async fn row_count(&self, table: &TableSchema) -> usize {
        self.tables
            .read()
            .await
            .get(table.name())
            .map_or(0, HashMap::len)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("Memory backend is closed");
        }
        Ok(())
    }
}

fn missing_table(table: &TableSchema) -> anyhow::Error {
    anyhow!("No such table: {}", table.name())
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn sync(&self, table: &TableSchema) -> Result<()> {
        self.ensure_open()?;
        self.tables
            .write()
            .await
            .entry(table.name().to_string())
            .or_default();
        Ok(())
    }

    async fn find_by_key(&self, table: &TableSchema, key: &str) -> Result<Option<CacheEntry>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let rows = tables.get(table.name()).ok_or_else(|| missing_table(table))?;
        Ok(rows.get(key).cloned())
    }

    async fn insert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| missing_table(table))?;

        if rows.contains_key(&entry.key) {
            bail!("Duplicate primary key: {}", entry.key);
        }
        rows.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn upsert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| missing_table(table))?;

        rows.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn delete_by_key(&self, table: &TableSchema, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| missing_table(table))?;
        Ok(rows.remove(key).is_some())
    }

    async fn delete_stale(&self, table: &TableSchema, key: &str, now: i64) -> Result<bool> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| missing_table(table))?;

        match rows.get(key) {
            Some(entry) if entry.is_stale_at(now) => {
                rows.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(&self, table: &TableSchema, now: i64) -> Result<u64> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table.name())
            .ok_or_else(|| missing_table(table))?;

        let before = rows.len();
        rows.retain(|_, entry| entry.expire >= now);
        Ok((before - rows.len()) as u64)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.tables.write().await.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}
