use std::fmt;

use crate::id::ObjectId;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Segment for identifier-keyed entries.
pub const ID_SEGMENT: &str = "_id";

/// Segment for filter-keyed entries.
pub const CUSTOM_SEGMENT: &str = "custom";

/// A hierarchical cache key.
///
/// Keys start from a caller-chosen radical and grow by appending segments.
///
/// ```
/// use arepo_core::cache::CacheKey;
///
/// let key = CacheKey::new("users").add("_id").add("65a1f0c2e4b0a1b2c3d4e5f6");
/// assert_eq!(key.as_str(), "users:_id:65a1f0c2e4b0a1b2c3d4e5f6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from a radical.
    pub fn new(radical: impl Into<String>) -> Self {
        Self(radical.into())
    }

    /// Returns a new key with `segment` appended.
    pub fn add(&self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref();
        if self.0.is_empty() {
            return Self(segment.to_string());
        }
        Self(format!("{}{}{}", self.0, KEY_SEPARATOR, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Returns the namespace holding identifier-keyed entries.
pub fn id_namespace(radical: &CacheKey) -> CacheKey {
    radical.add(ID_SEGMENT)
}

/// Returns the namespace holding filter-keyed entries.
pub fn custom_namespace(radical: &CacheKey) -> CacheKey {
    radical.add(CUSTOM_SEGMENT)
}

/// Returns the cache key for a single document.
pub fn id_key(id_namespace: &CacheKey, id: ObjectId) -> CacheKey {
    id_namespace.add(id.to_hex())
}
