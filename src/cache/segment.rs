//! Segment name validation.

use crate::error::{CacheError, Result};

/// Checks a segment name before it is used to build keys.
///
/// Rejects empty names and names containing a null character.
pub fn validate_segment_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CacheError::InvalidSegment("Empty string".to_string()));
    }

    if name.contains('\0') {
        return Err(CacheError::InvalidSegment(
            "Includes null character".to_string(),
        ));
    }

    Ok(())
}
