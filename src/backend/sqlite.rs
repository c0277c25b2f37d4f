//! SQLite-backed storage backend.
//!
//! Stores cache tables through rusqlite. Values are kept as JSON text and
//! parsed back into structured form on read. Blocking calls run on tokio's
//! blocking pool.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{StorageBackend, TableSchema};
use crate::cache::CacheEntry;

/// SQLite backend.
///
/// `SqliteBackend` is `Clone`; clones share one connection guarded by a Mutex.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Option<Connection>>>,
    open: Arc<AtomicBool>,
}

impl SqliteBackend {
    /// Opens or creates a database file at `path`.
    ///
    /// Parent directories are created if needed.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::open_sync(&path))
            .await
            .context("Task join error")?
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        tokio::task::spawn_blocking(|| {
            let conn = Connection::open_in_memory()
                .context("Failed to create in-memory SQLite database")?;
            Ok(Self::from_connection(conn))
        })
        .await
        .context("Task join error")?
    }

    /// Wraps an already opened rusqlite connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    fn open_sync(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;

        debug!("Opened SQLite database at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| anyhow!("Failed to acquire database lock: {e}"))?;
            let conn = guard.as_ref().ok_or_else(|| anyhow!("SQLite connection is closed"))?;
            f(conn)
        })
        .await
        .context("Task join error")?
    }
}

fn encode_value(entry: &CacheEntry) -> Result<String> {
    serde_json::to_string(&entry.value)
        .with_context(|| format!("Failed to encode value for {}", entry.key))
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn sync(&self, table: &TableSchema) -> Result<()> {
        let sql = table.create_statement();
        self.run(move |conn| {
            conn.execute_batch(&sql)
                .with_context(|| format!("Failed to execute batch: {sql}"))
        })
        .await
    }

    async fn find_by_key(&self, table: &TableSchema, key: &str) -> Result<Option<CacheEntry>> {
        let sql = format!(
            "SELECT \"key\", \"value\", \"stored\", \"ttl\", \"expire\" FROM {} WHERE \"key\" = ?1",
            table.quoted_name()
        );
        let key = key.to_string();

        self.run(move |conn| {
            let row = conn
                .query_row(&sql, params![key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                })
                .optional()
                .with_context(|| format!("Failed to execute query: {sql}"))?;

            let Some((key, raw, stored, ttl, expire)) = row else {
                return Ok(None);
            };

            let raw = raw.ok_or_else(|| anyhow!("Row {key} has no value"))?;
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("Malformed value in row {key}"))?;

            Ok(Some(CacheEntry {
                key,
                value,
                stored,
                ttl,
                expire: expire.unwrap_or_else(|| stored.saturating_add(ttl)),
            }))
        })
        .await
    }

    async fn insert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (\"key\", \"value\", \"stored\", \"ttl\", \"expire\") \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            table.quoted_name()
        );
        let value = encode_value(entry)?;
        let entry = entry.clone();

        self.run(move |conn| {
            conn.execute(
                &sql,
                params![entry.key, value, entry.stored, entry.ttl, entry.expire],
            )
            .with_context(|| format!("Failed to execute statement: {sql}"))?;
            Ok(())
        })
        .await
    }

    async fn upsert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (\"key\", \"value\", \"stored\", \"ttl\", \"expire\") \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(\"key\") DO UPDATE SET \
             \"value\" = excluded.\"value\", \"stored\" = excluded.\"stored\", \
             \"ttl\" = excluded.\"ttl\", \"expire\" = excluded.\"expire\"",
            table.quoted_name()
        );
        let value = encode_value(entry)?;
        let entry = entry.clone();

        self.run(move |conn| {
            conn.execute(
                &sql,
                params![entry.key, value, entry.stored, entry.ttl, entry.expire],
            )
            .with_context(|| format!("Failed to execute statement: {sql}"))?;
            Ok(())
        })
        .await
    }

    async fn delete_by_key(&self, table: &TableSchema, key: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE \"key\" = ?1", table.quoted_name());
        let key = key.to_string();

        self.run(move |conn| {
            let affected = conn
                .execute(&sql, params![key])
                .with_context(|| format!("Failed to execute statement: {sql}"))?;
            Ok(affected > 0)
        })
        .await
    }

    async fn delete_stale(&self, table: &TableSchema, key: &str, now: i64) -> Result<bool> {
        // SQLite promotes an overflowing integer sum to REAL rather than
        // saturating; the comparison still agrees with `CacheEntry::is_stale_at`.
        let sql = format!(
            "DELETE FROM {} WHERE \"key\" = ?1 AND \"stored\" + \"ttl\" < ?2",
            table.quoted_name()
        );
        let key = key.to_string();

        self.run(move |conn| {
            let affected = conn
                .execute(&sql, params![key, now])
                .with_context(|| format!("Failed to execute statement: {sql}"))?;
            Ok(affected > 0)
        })
        .await
    }

    async fn delete_expired(&self, table: &TableSchema, now: i64) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE \"expire\" < ?1", table.quoted_name());

        self.run(move |conn| {
            let affected = conn
                .execute(&sql, params![now])
                .with_context(|| format!("Failed to execute statement: {sql}"))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        self.open.store(false, Ordering::Release);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| anyhow!("Failed to acquire database lock: {e}"))?;
            if let Some(conn) = guard.take() {
                conn.close()
                    .map_err(|(_, e)| e)
                    .context("Failed to close SQLite connection")?;
            }
            Ok(())
        })
        .await
        .context("Task join error")?
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
