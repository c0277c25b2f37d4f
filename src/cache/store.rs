//! Cache Store Module
//!
//! Main cache engine: key derivation, staleness-aware reads and replace-or-insert
//! writes over the connection's storage handle.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{
    current_timestamp_ms, generate_key, validate_segment_name, CacheEntry, CacheKey, CacheStats,
    Envelope,
};
use crate::config::ClientOptions;
use crate::connection::Connection;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// TTL cache over a relational table.
///
/// Call [`CacheStore::start`] before any entry operation. The store is
/// `Send + Sync`; share it behind an `Arc` between tasks.
pub struct CacheStore {
    connection: Connection,
    stats: StatsRecorder,
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store wrapping `connection`.
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            stats: StatsRecorder::default(),
        }
    }

    /// Creates a store that opens its own handle from `options.url`.
    pub fn from_options(options: ClientOptions) -> Result<Self> {
        Ok(Self::new(Connection::new(options)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn partition(&self) -> Option<&str> {
        self.connection.options().partition.as_deref()
    }

    // == Lifecycle ==
    /// See [`Connection::start`].
    pub async fn start(&self) -> Result<()> {
        self.connection.start().await
    }

    /// See [`Connection::stop`].
    pub async fn stop(&self) {
        self.connection.stop().await
    }

    /// See [`Connection::is_ready`].
    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    // == Keys ==
    /// Derives the storage key for `key` under this store's partition.
    pub fn generate_key(&self, key: &CacheKey) -> Result<String> {
        generate_key(self.partition(), key)
    }

    /// See [`validate_segment_name`].
    pub fn validate_segment_name(&self, name: &str) -> Result<()> {
        validate_segment_name(name)
    }

    // == Get ==
    /// Retrieves a live entry.
    ///
    /// Returns `Ok(None)` when no record exists or the record is stale. A
    /// stale record is deleted opportunistically; failure to delete is logged
    /// and the read is still a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<Envelope<T>>> {
        let storage_key = self.generate_key(key)?;
        let binding = self.connection.binding("get").await?;

        let entry = binding
            .backend()
            .find_by_key(&binding.table, &storage_key)
            .await
            .map_err(|e| CacheError::backend("get", storage_key.as_str(), e))?;

        let Some(entry) = entry else {
            debug!("Cache miss: {}", storage_key);
            self.stats.record_miss();
            return Ok(None);
        };

        let now = current_timestamp_ms();
        if entry.is_stale_at(now) {
            debug!("Cache entry stale: {}", storage_key);
            self.stats.record_stale();
            if let Err(e) = binding
                .backend()
                .delete_stale(&binding.table, &storage_key, now)
                .await
            {
                warn!("Failed to purge stale entry {}: {:#}", storage_key, e);
            }
            return Ok(None);
        }

        let item = serde_json::from_value(entry.value).map_err(|source| {
            CacheError::Serialization {
                operation: "get",
                key: storage_key.clone(),
                source,
            }
        })?;

        debug!("Cache hit: {}", storage_key);
        self.stats.record_hit();
        Ok(Some(Envelope {
            item,
            stored: entry.stored,
            ttl: entry.ttl,
        }))
    }

    // == Set ==
    /// Stores `value` for `ttl` milliseconds, replacing any existing record.
    ///
    /// A `ttl <= 0` is a no-op. The replace goes through the backend's
    /// upsert, so a concurrent reader never sees the key absent mid-write on
    /// backends that implement it atomically.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, ttl: i64) -> Result<()> {
        let storage_key = self.generate_key(key)?;
        let binding = self.connection.binding("set").await?;

        if ttl <= 0 {
            debug!("Skipping write of {} with non-positive ttl {}", storage_key, ttl);
            self.stats.record_skipped_write();
            return Ok(());
        }

        let value = serde_json::to_value(value).map_err(|source| CacheError::Serialization {
            operation: "set",
            key: storage_key.clone(),
            source,
        })?;

        let entry = CacheEntry::new(storage_key, value, ttl);
        binding
            .backend()
            .upsert(&binding.table, &entry)
            .await
            .map_err(|e| CacheError::backend("set", entry.key.as_str(), e))?;

        debug!("Cache write: {} (ttl {}ms)", entry.key, ttl);
        self.stats.record_write();
        Ok(())
    }

    // == Drop ==
    /// Removes the record for `key`. Removing an absent key succeeds.
    ///
    /// # Note
    /// Through an `Arc<CacheStore>`, `store.drop(..)` resolves to
    /// `Drop::drop` on the `Arc`. Call `CacheStore::drop(&store, &key)` instead.
    pub async fn drop(&self, key: &CacheKey) -> Result<()> {
        let storage_key = self.generate_key(key)?;
        let binding = self.connection.binding("drop").await?;

        let removed = binding
            .backend()
            .delete_by_key(&binding.table, &storage_key)
            .await
            .map_err(|e| CacheError::backend("drop", storage_key.as_str(), e))?;

        debug!("Cache drop: {} (removed: {})", storage_key, removed);
        self.stats.record_drop();
        Ok(())
    }

    // == Sweep Expired ==
    /// Deletes every expired record in the partition table.
    ///
    /// Returns the number of rows removed. Reads never depend on this.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let binding = self.connection.binding("sweep").await?;

        let removed = binding
            .backend()
            .delete_expired(&binding.table, current_timestamp_ms())
            .await
            .map_err(|e| CacheError::backend("sweep", binding.table.name(), e))?;

        self.stats.record_swept(removed);
        Ok(removed)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
