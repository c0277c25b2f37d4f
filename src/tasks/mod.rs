//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a store is started.
//!
//! # Tasks
//! - Expiry sweep: deletes expired rows at a configured interval. Reads never
//!   rely on it; stale rows are already treated as misses.

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_configured_cleanup_task};
