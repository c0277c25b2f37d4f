//! Cache Module
//!
//! Key derivation, record envelopes and the TTL-aware entry store.

mod entry;
mod key;
mod policy;
mod segment;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, Envelope};
pub use key::{generate_key, CacheKey};
pub use policy::Policy;
pub use segment::validate_segment_name;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Partition used when none is configured
pub const DEFAULT_PARTITION: &str = "catbox";

/// Joins the encoded parts of a storage key
pub const KEY_SEPARATOR: &str = ":";
