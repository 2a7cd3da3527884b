//! Process-local cache backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use rowbridge_core::{CacheError, EntityKind, RowbridgeResult};

use super::key::CacheKey;
use super::traits::{CacheBackend, CacheStats, CachedValue};

/// Configuration for the in-memory cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries held before evicting.
    pub max_entries: usize,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the max entries. Zero is treated as one.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }
}

/// A `HashMap` behind a lock, with hit/miss accounting.
///
/// Eviction on overflow drops one arbitrary existing entry; nothing here
/// relies on which one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CachedValue>>>,
    counters: Arc<Counters>,
    config: InMemoryCacheConfig,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCache {
    /// Create a new cache with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> RowbridgeResult<bool> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }

    /// Remove every entry of one entity kind. Returns how many were removed.
    ///
    /// Matches by namespace prefix, so it also drops entries of any kind
    /// whose namespace extends this one (`catalog.Tag_Group` for
    /// `catalog.Tag`).
    pub fn invalidate_kind(&self, kind: &EntityKind) -> RowbridgeResult<u64> {
        let prefix = CacheKey::kind_prefix(kind);
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        Ok((before - entries.len()) as u64)
    }

    /// Drop all entries. Counters are kept.
    pub fn clear(&self) -> RowbridgeResult<()> {
        self.entries
            .write()
            .map_err(|_| CacheError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

impl CacheBackend for InMemoryCache {
    fn get(&self, key: &str) -> RowbridgeResult<Option<CachedValue>> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        let value = entries.get(key).cloned();
        let counter = if value.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    fn set(&self, key: &str, value: CachedValue) -> RowbridgeResult<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            let victim = entries.keys().next().cloned();
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(key.to_string(), value);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> RowbridgeResult<CacheStats> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbridge_core::Entity;

    fn entity(pk: i64) -> CachedValue {
        CachedValue::Entity(Arc::new(Entity::new(EntityKind::new("catalog", "Category"), pk)))
    }

    #[test]
    fn test_get_set_and_stats() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("catalog_category_1").unwrap(), None);

        cache.set("catalog_category_1", entity(1)).unwrap();
        cache.set("catalog_category_2", CachedValue::Missing).unwrap();

        assert_eq!(cache.get("catalog_category_1").unwrap(), Some(entity(1)));
        assert_eq!(
            cache.get("catalog_category_2").unwrap(),
            Some(CachedValue::Missing)
        );

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.entry_count, 2);
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let cache = InMemoryCache::new();
        cache.set("k", CachedValue::Missing).unwrap();
        cache.set("k", entity(3)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(entity(3)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_one_entry() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::new().with_max_entries(2));
        cache.set("a", entity(1)).unwrap();
        cache.set("b", entity(2)).unwrap();
        cache.set("c", entity(3)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("c").unwrap(), Some(entity(3)));
        assert_eq!(cache.stats().unwrap().evictions, 1);

        // Overwriting an existing key never evicts.
        cache.set("c", entity(4)).unwrap();
        assert_eq!(cache.stats().unwrap().evictions, 1);
    }

    #[test]
    fn test_invalidate_kind_only_touches_that_namespace() {
        let cache = InMemoryCache::new();
        let category = EntityKind::new("catalog", "Category");
        let tag = EntityKind::new("catalog", "Tag");
        cache.set(CacheKey::new(&category, "1").as_str(), entity(1)).unwrap();
        cache.set(CacheKey::new(&category, "2").as_str(), entity(2)).unwrap();
        cache.set(CacheKey::new(&tag, "1").as_str(), entity(1)).unwrap();

        assert_eq!(cache.invalidate_kind(&category).unwrap(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.delete(CacheKey::new(&tag, "1").as_str()).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_kind_reaches_prefix_sharing_kinds() {
        let cache = InMemoryCache::new();
        let tag = EntityKind::new("catalog", "Tag");
        let tag_group = EntityKind::new("catalog", "Tag_Group");
        cache.set(CacheKey::new(&tag, "1").as_str(), entity(1)).unwrap();
        cache.set(CacheKey::new(&tag_group, "2").as_str(), entity(2)).unwrap();

        assert_eq!(cache.invalidate_kind(&tag).unwrap(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = InMemoryCache::new();
        let other = cache.clone();
        cache.set("k", entity(1)).unwrap();
        assert_eq!(other.get("k").unwrap(), Some(entity(1)));
        cache.clear().unwrap();
        assert!(other.is_empty());
    }
}
