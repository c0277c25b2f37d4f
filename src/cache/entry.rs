//! Cache Entry Module
//!
//! Defines the persisted record shape and the envelope returned to callers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single persisted cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Derived storage key (primary key)
    pub key: String,
    /// The cached payload in structured form
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub stored: i64,
    /// Time-to-live in milliseconds
    pub ttl: i64,
    /// `stored + ttl`, kept for server-side sweeps only
    pub expire: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a record stamped with the current time.
    pub fn new(key: String, value: Value, ttl: i64) -> Self {
        Self::stored_at(key, value, current_timestamp_ms(), ttl)
    }

    /// Creates a record with an explicit creation timestamp.
    pub fn stored_at(key: String, value: Value, stored: i64, ttl: i64) -> Self {
        Self {
            key,
            value,
            stored,
            ttl,
            expire: stored.saturating_add(ttl),
        }
    }

    // == Is Stale ==
    /// Checks whether the record is past its lifetime at `now`.
    ///
    /// Always recomputed from `stored + ttl`; the `expire` column is not
    /// consulted. A record is still live at exactly `stored + ttl`.
    pub fn is_stale_at(&self, now: i64) -> bool {
        self.stored.saturating_add(self.ttl) < now
    }

    /// Checks whether the record is stale at the current time.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(current_timestamp_ms())
    }
}

// == Envelope ==
/// A live cached item together with the metadata needed to judge staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The cached value, decoded to its original form
    pub item: T,
    /// Creation timestamp (Unix milliseconds)
    pub stored: i64,
    /// Time-to-live in milliseconds
    pub ttl: i64,
}

impl<T> Envelope<T> {
    /// Returns the remaining lifetime in milliseconds at `now`, floored at 0.
    pub fn ttl_remaining_at(&self, now: i64) -> i64 {
        (self.stored.saturating_add(self.ttl) - now).max(0)
    }

    /// Returns the remaining lifetime in milliseconds.
    pub fn ttl_remaining(&self) -> i64 {
        self.ttl_remaining_at(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
