//! Configuration Module
//!
//! Handles construction-time options for a cache client, either built in code
//! or loaded from environment variables.

use std::env;

use crate::cache::DEFAULT_PARTITION;
use crate::error::{CacheError, Result};

/// Cache client options.
///
/// An externally managed storage handle is not part of this struct; pass it
/// to [`crate::Connection::with_handle`] instead. When a handle is supplied,
/// `url` is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Logical table/namespace name, also used as the key prefix
    pub partition: Option<String>,
    /// Connection descriptor used to open a new backing-store connection
    pub url: Option<String>,
    /// Background sweep interval in seconds, None = no sweep
    pub cleanup_interval: Option<u64>,
}

impl ClientOptions {
    /// Creates options with the default partition and no connection descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PARTITION` - Partition name (default: "catbox")
    /// - `CACHE_URL` - Connection descriptor (default: none)
    /// - `CACHE_CLEANUP_INTERVAL` - Sweep interval in seconds (default: no sweep)
    pub fn from_env() -> Self {
        Self {
            partition: env::var("CACHE_PARTITION")
                .ok()
                .or_else(|| Some(DEFAULT_PARTITION.to_string())),
            url: env::var("CACHE_URL").ok(),
            cleanup_interval: env::var("CACHE_CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Sets the partition name.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Clears the partition; keys are then derived without a prefix.
    pub fn without_partition(mut self) -> Self {
        self.partition = None;
        self
    }

    /// Sets the connection descriptor.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Enables the background sweep with the given interval in seconds.
    pub fn with_cleanup_interval(mut self, seconds: u64) -> Self {
        self.cleanup_interval = Some(seconds);
        self
    }

    /// Name of the backing table for these options.
    pub fn table_name(&self) -> &str {
        self.partition.as_deref().unwrap_or(DEFAULT_PARTITION)
    }

    /// Checks the options for values that cannot name a table.
    pub fn validate(&self) -> Result<()> {
        if let Some(partition) = &self.partition {
            if partition.is_empty() {
                return Err(CacheError::Configuration(
                    "Partition cannot be empty".to_string(),
                ));
            }
            if partition.contains('\0') {
                return Err(CacheError::Configuration(
                    "Partition includes null character".to_string(),
                ));
            }
        }

        if self.cleanup_interval == Some(0) {
            return Err(CacheError::Configuration(
                "Cleanup interval must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            partition: Some(DEFAULT_PARTITION.to_string()),
            url: None,
            cleanup_interval: None,
        }
    }
}
