//! Expiry Sweep Task
//!
//! Background task that periodically deletes expired rows from the
//! partition table.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired rows.
///
/// Each tick is skipped while the store is not ready, so the task may be
/// spawned before `start()` and survives a `stop()`/`start()` cycle. Sweep
/// failures are logged and the loop continues.
///
/// # Arguments
/// * `store` - Shared cache store
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop sweeping.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::from_options(options)?);
/// store.start().await?;
/// let sweeper = spawn_cleanup_task(store.clone(), 60);
/// // Later, during shutdown:
/// sweeper.abort();
/// store.stop().await;
/// ```
pub fn spawn_cleanup_task(store: Arc<CacheStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    spawn_sweep(store, Duration::from_secs(cleanup_interval_secs))
}

/// Spawns the sweep if the store's options configure an interval.
pub fn spawn_configured_cleanup_task(store: Arc<CacheStore>) -> Option<JoinHandle<()>> {
    let interval = store.connection().options().cleanup_interval?;
    Some(spawn_cleanup_task(store, interval))
}

fn spawn_sweep(store: Arc<CacheStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            if !store.is_ready() {
                debug!("Expiry sweep: store not ready, skipping");
                continue;
            }

            match store.sweep_expired().await {
                Ok(0) => debug!("Expiry sweep: no expired rows found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired rows", removed),
                Err(e) => warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}
