//! Key Derivation Module
//!
//! Turns a `(segment, id)` descriptor into the storage primary key.

use serde::{Deserialize, Serialize};

use crate::cache::KEY_SEPARATOR;
use crate::error::{CacheError, Result};

// == Cache Key ==
/// A two-part key descriptor. `CacheKey::default()` is the empty descriptor
/// and is always rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Namespace grouping related keys
    #[serde(default)]
    pub segment: String,
    /// Identifier within the segment
    #[serde(default)]
    pub id: String,
}

impl CacheKey {
    pub fn new(segment: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            id: id.into(),
        }
    }
}

// == Generate Key ==
/// Derives the storage key for `key`.
///
/// Each part is percent-encoded independently, so a separator inside a part
/// cannot produce an ambiguous key. With a partition the result is
/// `partition:segment:id`, otherwise `segment:id`. The partition is
/// percent-encoded like the other parts, so it may differ from the table name.
pub fn generate_key(partition: Option<&str>, key: &CacheKey) -> Result<String> {
    if key.segment.is_empty() {
        return Err(CacheError::InvalidKey(
            "Segment is missing or empty".to_string(),
        ));
    }
    if key.id.is_empty() {
        return Err(CacheError::InvalidKey("Id is missing or empty".to_string()));
    }

    let mut parts = Vec::with_capacity(3);
    if let Some(partition) = partition {
        parts.push(urlencoding::encode(partition));
    }
    parts.push(urlencoding::encode(&key.segment));
    parts.push(urlencoding::encode(&key.id));

    Ok(parts.join(KEY_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_with_partition() {
        let key = CacheKey::new("baz", "bar");
        assert_eq!(generate_key(Some("foo"), &key).unwrap(), "foo:baz:bar");
    }

    #[test]
    fn test_generate_key_without_partition() {
        let key = CacheKey::new("baz", "bar");
        assert_eq!(generate_key(None, &key).unwrap(), "baz:bar");
    }

    #[test]
    fn test_generate_key_encodes_separator() {
        let a = generate_key(None, &CacheKey::new("a:b", "c")).unwrap();
        let b = generate_key(None, &CacheKey::new("a", "b:c")).unwrap();

        assert_eq!(a, "a%3Ab:c");
        assert_eq!(b, "a:b%3Ac");
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_key_encodes_partition() {
        let key = CacheKey::new("seg", "id");
        assert_eq!(
            generate_key(Some("hapi test"), &key).unwrap(),
            "hapi%20test:seg:id"
        );
        assert_eq!(generate_key(Some("a:b"), &key).unwrap(), "a%3Ab:seg:id");
    }

    #[test]
    fn test_generate_key_rejects_empty_parts() {
        assert!(matches!(
            generate_key(None, &CacheKey::default()),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            generate_key(None, &CacheKey::new("", "x")),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            generate_key(Some("p"), &CacheKey::new("s", "")),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_missing_fields_deserialize_to_invalid_key() {
        let key: CacheKey = serde_json::from_str("{}").unwrap();
        assert!(generate_key(None, &key).is_err());
    }
}
