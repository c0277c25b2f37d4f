//! Segment Policy Module
//!
//! A segment-bound view over a shared [`CacheStore`] with a fixed lifetime for
//! every write, the shape a host framework's per-consumer cache takes.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{validate_segment_name, CacheKey, CacheStore, Envelope};
use crate::error::{CacheError, Result};

// == Policy ==
/// Cache access scoped to one segment.
#[derive(Clone)]
pub struct Policy {
    store: Arc<CacheStore>,
    segment: String,
    expires_in: i64,
}

impl Policy {
    /// Creates a policy for `segment`, writing entries that live `expires_in`.
    ///
    /// Fails with `InvalidSegment` when the segment name is rejected and with
    /// `Configuration` when `expires_in` rounds to zero milliseconds.
    pub fn new(store: Arc<CacheStore>, segment: impl Into<String>, expires_in: Duration) -> Result<Self> {
        let segment = segment.into();
        validate_segment_name(&segment)?;

        let expires_in = i64::try_from(expires_in.as_millis()).unwrap_or(i64::MAX);
        if expires_in <= 0 {
            return Err(CacheError::Configuration(
                "expires_in must be at least 1 millisecond".to_string(),
            ));
        }

        Ok(Self {
            store,
            segment,
            expires_in,
        })
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Lifetime of written entries in milliseconds.
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    fn key(&self, id: &str) -> CacheKey {
        CacheKey::new(self.segment.as_str(), id)
    }

    /// Returns the cached value for `id`, or None on a miss.
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        Ok(self.get_with_meta(id).await?.map(|envelope| envelope.item))
    }

    /// Returns the full envelope for `id`, or None on a miss.
    pub async fn get_with_meta<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Envelope<T>>> {
        self.store.get(&self.key(id)).await
    }

    /// Stores `value` for `id` with the policy lifetime.
    pub async fn set<T: Serialize + ?Sized>(&self, id: &str, value: &T) -> Result<()> {
        self.store.set(&self.key(id), value, self.expires_in).await
    }

    /// Removes the value for `id`.
    pub async fn drop(&self, id: &str) -> Result<()> {
        CacheStore::drop(&self.store, &self.key(id)).await
    }
}
