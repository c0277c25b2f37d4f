//! Storage Backend Module
//!
//! The abstract storage interface the cache core depends on, the table
//! definition it binds, and the built-in backends.
//!
//! # Backends
//! - [`MemoryBackend`] - in-process tables, nothing persisted
//! - [`SqliteBackend`] - rusqlite, file-backed or `:memory:`

mod memory;
mod sqlite;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::cache::CacheEntry;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

// == Table Schema ==
/// A column of the cache table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
}

/// Columns of every cache table.
pub const CACHE_COLUMNS: &[Column] = &[
    Column { name: "key", sql_type: "TEXT", primary_key: true },
    Column { name: "value", sql_type: "TEXT", primary_key: false },
    Column { name: "stored", sql_type: "INTEGER", primary_key: false },
    Column { name: "ttl", sql_type: "INTEGER", primary_key: false },
    Column { name: "expire", sql_type: "INTEGER", primary_key: false },
];

/// Table definition bound by one connection for its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: &'static [Column],
}

impl TableSchema {
    /// Defines the cache table named `name`.
    pub fn cache_table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: CACHE_COLUMNS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        self.columns
    }

    /// The table name as a quoted SQL identifier.
    pub fn quoted_name(&self) -> String {
        format!("\"{}\"", self.name.replace('"', "\"\""))
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_statement(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("\"{}\" {} PRIMARY KEY NOT NULL", c.name, c.sql_type)
                } else {
                    format!("\"{}\" {}", c.name, c.sql_type)
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quoted_name(),
            columns.join(", ")
        )
    }
}

// == Storage Backend ==
/// Primary-key storage operations over a cache table.
///
/// Implementations own their connection. All methods may suspend on I/O;
/// none of them enforce a timeout.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Ensures the table exists.
    async fn sync(&self, table: &TableSchema) -> Result<()>;

    /// Looks up a record by primary key.
    async fn find_by_key(&self, table: &TableSchema, key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts a new record. Fails if the key already exists.
    async fn insert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()>;

    /// Replaces or inserts a record.
    ///
    /// The default deletes then inserts, which leaves a short window with no
    /// record. Backends with a native upsert should override it.
    async fn upsert(&self, table: &TableSchema, entry: &CacheEntry) -> Result<()> {
        self.delete_by_key(table, &entry.key).await?;
        self.insert(table, entry).await
    }

    /// Deletes a record. Returns whether a row was removed.
    async fn delete_by_key(&self, table: &TableSchema, key: &str) -> Result<bool>;

    /// Deletes `key` only if its record is stale at `now`.
    async fn delete_stale(&self, table: &TableSchema, key: &str, now: i64) -> Result<bool>;

    /// Deletes every record whose `expire` is before `now`.
    async fn delete_expired(&self, table: &TableSchema, now: i64) -> Result<u64>;

    /// Releases the connection. Later calls fail.
    async fn close(&self) -> Result<()>;

    /// Non-blocking liveness hint.
    fn is_open(&self) -> bool {
        true
    }
}

// == Connector ==
/// Opens a backend from a connection descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn StorageBackend>>;
}

/// Connector for the built-in backends.
///
/// # Descriptors
/// - `memory:` or `memory://` - [`MemoryBackend`]
/// - `sqlite::memory:` - in-memory [`SqliteBackend`]
/// - `sqlite://<path>` or `sqlite:<path>` - file-backed [`SqliteBackend`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn StorageBackend>> {
        if url == "memory:" || url == "memory://" {
            return Ok(Arc::new(MemoryBackend::new()));
        }

        if url == "sqlite::memory:" {
            return Ok(Arc::new(SqliteBackend::open_in_memory().await?));
        }

        if let Some(rest) = url.strip_prefix("sqlite:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                bail!("SQLite descriptor has no path: {url}");
            }
            return Ok(Arc::new(SqliteBackend::open(path).await?));
        }

        bail!("Unsupported connection descriptor: {url}")
    }
}
