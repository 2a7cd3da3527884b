//! Cache backend trait and cached value type.

use rowbridge_core::{EntityRef, RowbridgeResult};

/// What a reference resolution leaves in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// The identifier resolved to this entity.
    Entity(EntityRef),
    /// The identifier resolved to nothing (negative cache entry).
    Missing,
}

impl CachedValue {
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            CachedValue::Entity(entity) => Some(entity),
            CachedValue::Missing => None,
        }
    }
}

impl From<Option<EntityRef>> for CachedValue {
    fn from(value: Option<EntityRef>) -> Self {
        match value {
            Some(entity) => CachedValue::Entity(entity),
            None => CachedValue::Missing,
        }
    }
}

/// Cache backend trait for pluggable cache implementations.
///
/// A plain get/set store keyed by opaque strings. No expiry or consistency
/// contract is assumed: a backend may evict at will and a hit may be stale.
/// Implementations must be safe to share across threads; concurrent writers
/// of the same key always write equivalent values, so last-write-wins is fine.
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache, or `None` on a miss.
    fn get(&self, key: &str) -> RowbridgeResult<Option<CachedValue>>;

    /// Put a value into the cache, overwriting any previous entry.
    fn set(&self, key: &str, value: CachedValue) -> RowbridgeResult<()>;

    /// Get cache statistics. Backends that do not count report zeros.
    fn stats(&self) -> RowbridgeResult<CacheStats> {
        Ok(CacheStats::default())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits (negative entries included).
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of writes.
    pub writes: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
