//! Table Cache - a key/value cache with TTL expiry backed by a relational table
//!
//! Entries are keyed by `(segment, id)`, stored with their creation time and
//! ttl, and treated as absent once stale. The storage backend is pluggable;
//! in-memory and SQLite backends are built in.
//!
//! ```no_run
//! use table_cache::{CacheKey, CacheStore, ClientOptions, Envelope};
//!
//! # async fn example() -> table_cache::Result<()> {
//! let store = CacheStore::from_options(ClientOptions::new().with_url("sqlite::memory:"))?;
//! store.start().await?;
//!
//! let key = CacheKey::new("users", "42");
//! store.set(&key, "alice", 60_000).await?;
//!
//! let hit: Option<Envelope<String>> = store.get(&key).await?;
//! assert_eq!(hit.map(|e| e.item).as_deref(), Some("alice"));
//!
//! store.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod tasks;

pub use backend::{Connector, DefaultConnector, MemoryBackend, SqliteBackend, StorageBackend, TableSchema};
pub use cache::{CacheEntry, CacheKey, CacheStats, CacheStore, Envelope, Policy};
pub use config::ClientOptions;
pub use connection::{Connection, StoreHandle};
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
