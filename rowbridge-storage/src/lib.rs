//! Rowbridge Storage - Collaborator Contracts and In-Memory Implementations
//!
//! Defines the narrow entity-storage and cache interfaces the converters
//! consume. Real backends live with the application; this crate ships an
//! in-memory store and cache for tests and small sessions.

pub mod cache;

pub use cache::{
    normalize_identifier, CacheBackend, CacheKey, CacheStats, CachedValue, InMemoryCache,
    InMemoryCacheConfig,
};

use rowbridge_core::{
    Entity, EntityKind, EntityRef, EntitySchema, Lookup, PrimaryKey, RowbridgeResult,
    StorageError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Entity storage as seen by the conversion layer.
///
/// Single-entity lookups report misses and malformed keys through
/// [`Lookup`]; `Err` is reserved for infrastructure failures, which callers
/// propagate untouched.
pub trait EntityStore: Send + Sync {
    /// Get an entity by primary key, given as external text.
    fn get_by_primary_key(&self, kind: &EntityKind, key: &str) -> RowbridgeResult<Lookup>;

    /// Get the single entity whose `attribute` equals `value`.
    fn get_by_attribute(
        &self,
        kind: &EntityKind,
        attribute: &str,
        value: &str,
    ) -> RowbridgeResult<Lookup>;

    /// Whether entities of `kind` define `attribute`.
    fn attribute_exists(&self, kind: &EntityKind, attribute: &str) -> RowbridgeResult<bool>;

    /// Get every entity whose primary key is among `keys`, in storage order.
    fn filter_by_primary_keys(
        &self,
        kind: &EntityKind,
        keys: &[&str],
    ) -> RowbridgeResult<Vec<EntityRef>>;
}

impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    fn get_by_primary_key(&self, kind: &EntityKind, key: &str) -> RowbridgeResult<Lookup> {
        (**self).get_by_primary_key(kind, key)
    }

    fn get_by_attribute(
        &self,
        kind: &EntityKind,
        attribute: &str,
        value: &str,
    ) -> RowbridgeResult<Lookup> {
        (**self).get_by_attribute(kind, attribute, value)
    }

    fn attribute_exists(&self, kind: &EntityKind, attribute: &str) -> RowbridgeResult<bool> {
        (**self).attribute_exists(kind, attribute)
    }

    fn filter_by_primary_keys(
        &self,
        kind: &EntityKind,
        keys: &[&str],
    ) -> RowbridgeResult<Vec<EntityRef>> {
        (**self).filter_by_primary_keys(kind, keys)
    }
}

// ============================================================================
// MOCK STORAGE
// ============================================================================

/// In-memory mock storage for testing.
///
/// Entity kinds must be registered with a schema before entities are
/// inserted. Every trait call is counted so tests can assert that a cached
/// resolution skipped storage.
#[derive(Debug, Default, Clone)]
pub struct MockStorage {
    schemas: Arc<RwLock<HashMap<EntityKind, EntitySchema>>>,
    entities: Arc<RwLock<HashMap<EntityKind, BTreeMap<PrimaryKey, EntityRef>>>>,
    calls: Arc<CallCounters>,
}

#[derive(Debug, Default)]
struct CallCounters {
    primary_lookups: AtomicU64,
    attribute_lookups: AtomicU64,
    attribute_checks: AtomicU64,
    batch_filters: AtomicU64,
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the schema of an entity kind.
    pub fn register(&self, schema: EntitySchema) -> RowbridgeResult<()> {
        let mut schemas = self.schemas.write().map_err(|_| StorageError::LockPoisoned)?;
        schemas.insert(schema.kind.clone(), schema);
        Ok(())
    }

    /// Insert an entity, returning the shared handle storage keeps.
    pub fn insert(&self, entity: Entity) -> RowbridgeResult<EntityRef> {
        let schema = self.schema(&entity.kind)?;
        if entity.pk.key_type() != schema.key_type {
            return Err(StorageError::InsertFailed {
                kind: entity.kind.clone(),
                reason: format!(
                    "primary key {} is {:?}, schema expects {:?}",
                    entity.pk,
                    entity.pk.key_type(),
                    schema.key_type
                ),
            }
            .into());
        }
        if let Some(name) = entity.attributes.keys().find(|a| !schema.has_attribute(a)) {
            return Err(StorageError::InsertFailed {
                kind: entity.kind.clone(),
                reason: format!("attribute {} is not in the schema", name),
            }
            .into());
        }

        let mut entities = self.entities.write().map_err(|_| StorageError::LockPoisoned)?;
        let table = entities.entry(entity.kind.clone()).or_default();
        if table.contains_key(&entity.pk) {
            return Err(StorageError::InsertFailed {
                kind: entity.kind.clone(),
                reason: "already exists".to_string(),
            }
            .into());
        }
        let entity = Arc::new(entity);
        table.insert(entity.pk.clone(), entity.clone());
        Ok(entity)
    }

    /// Clear all stored entities. Schemas and counters are kept.
    pub fn clear(&self) -> RowbridgeResult<()> {
        self.entities
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .clear();
        Ok(())
    }

    /// Get count of stored entities of one kind.
    pub fn entity_count(&self, kind: &EntityKind) -> usize {
        self.entities
            .read()
            .map(|e| e.get(kind).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of `get_by_primary_key` calls so far.
    pub fn primary_lookups(&self) -> u64 {
        self.calls.primary_lookups.load(Ordering::Relaxed)
    }

    /// Number of `get_by_attribute` calls so far.
    pub fn attribute_lookups(&self) -> u64 {
        self.calls.attribute_lookups.load(Ordering::Relaxed)
    }

    /// Number of `attribute_exists` calls so far.
    pub fn attribute_checks(&self) -> u64 {
        self.calls.attribute_checks.load(Ordering::Relaxed)
    }

    /// Number of `filter_by_primary_keys` calls so far.
    pub fn batch_filters(&self) -> u64 {
        self.calls.batch_filters.load(Ordering::Relaxed)
    }

    /// Sum of every counted storage call.
    pub fn total_queries(&self) -> u64 {
        self.primary_lookups()
            + self.attribute_lookups()
            + self.attribute_checks()
            + self.batch_filters()
    }

    pub fn reset_counters(&self) {
        self.calls.primary_lookups.store(0, Ordering::Relaxed);
        self.calls.attribute_lookups.store(0, Ordering::Relaxed);
        self.calls.attribute_checks.store(0, Ordering::Relaxed);
        self.calls.batch_filters.store(0, Ordering::Relaxed);
    }

    fn schema(&self, kind: &EntityKind) -> RowbridgeResult<EntitySchema> {
        let schemas = self.schemas.read().map_err(|_| StorageError::LockPoisoned)?;
        schemas.get(kind).cloned().ok_or_else(|| {
            StorageError::UnknownKind { kind: kind.clone() }.into()
        })
    }
}

impl EntityStore for MockStorage {
    fn get_by_primary_key(&self, kind: &EntityKind, key: &str) -> RowbridgeResult<Lookup> {
        self.calls.primary_lookups.fetch_add(1, Ordering::Relaxed);
        let schema = self.schema(kind)?;
        let Some(pk) = schema.key_type.parse(key) else {
            return Ok(Lookup::MalformedKey);
        };

        let entities = self.entities.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entities.get(kind).and_then(|t| t.get(&pk)).cloned().into())
    }

    fn get_by_attribute(
        &self,
        kind: &EntityKind,
        attribute: &str,
        value: &str,
    ) -> RowbridgeResult<Lookup> {
        self.calls.attribute_lookups.fetch_add(1, Ordering::Relaxed);
        let schema = self.schema(kind)?;
        if !schema.has_attribute(attribute) {
            return Err(StorageError::UnknownAttribute {
                kind: kind.clone(),
                attribute: attribute.to_string(),
            }
            .into());
        }

        let entities = self.entities.read().map_err(|_| StorageError::LockPoisoned)?;
        let matches: Vec<&EntityRef> = entities
            .get(kind)
            .into_iter()
            .flat_map(|t| t.values())
            .filter(|e| e.attribute(attribute) == Some(value))
            .collect();

        match matches.as_slice() {
            [] => Ok(Lookup::NotFound),
            [entity] => Ok(Lookup::Found(Arc::clone(entity))),
            many => Err(StorageError::AmbiguousAttribute {
                kind: kind.clone(),
                attribute: attribute.to_string(),
                value: value.to_string(),
                count: many.len(),
            }
            .into()),
        }
    }

    fn attribute_exists(&self, kind: &EntityKind, attribute: &str) -> RowbridgeResult<bool> {
        self.calls.attribute_checks.fetch_add(1, Ordering::Relaxed);
        Ok(self.schema(kind)?.has_attribute(attribute))
    }

    fn filter_by_primary_keys(
        &self,
        kind: &EntityKind,
        keys: &[&str],
    ) -> RowbridgeResult<Vec<EntityRef>> {
        self.calls.batch_filters.fetch_add(1, Ordering::Relaxed);
        let schema = self.schema(kind)?;
        let mut wanted = Vec::with_capacity(keys.len());
        for key in keys {
            let pk = schema.key_type.parse(key).ok_or_else(|| StorageError::MalformedKey {
                kind: kind.clone(),
                key: key.to_string(),
            })?;
            wanted.push(pk);
        }

        let entities = self.entities.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entities
            .get(kind)
            .into_iter()
            .flat_map(|t| t.iter())
            .filter(|(pk, _)| wanted.contains(pk))
            .map(|(_, e)| e.clone())
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rowbridge_core::KeyType;

    fn storage_with(pks: &[i64]) -> MockStorage {
        let kind = EntityKind::new("catalog", "Tag");
        let storage = MockStorage::new();
        storage.register(EntitySchema::new(kind.clone(), KeyType::Integer)).unwrap();
        for pk in pks {
            storage.insert(Entity::new(kind.clone(), *pk)).unwrap();
        }
        storage
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: a key that was never inserted is reported as NotFound
        #[test]
        fn prop_missing_key_is_not_found(
            pks in prop::collection::btree_set(0i64..1000, 0..20),
            absent in 1000i64..2000
        ) {
            let pks: Vec<i64> = pks.into_iter().collect();
            let storage = storage_with(&pks);
            let kind = EntityKind::new("catalog", "Tag");
            let lookup = storage.get_by_primary_key(&kind, &absent.to_string()).unwrap();
            prop_assert_eq!(lookup, Lookup::NotFound);
        }

        /// Property: batch filter returns exactly the stored keys that were asked for
        #[test]
        fn prop_filter_returns_intersection(
            stored in prop::collection::btree_set(0i64..50, 0..20),
            asked in prop::collection::btree_set(0i64..50, 0..20)
        ) {
            let storage = storage_with(&stored.iter().copied().collect::<Vec<_>>());
            let kind = EntityKind::new("catalog", "Tag");
            let asked_text: Vec<String> = asked.iter().map(|k| k.to_string()).collect();
            let asked_refs: Vec<&str> = asked_text.iter().map(String::as_str).collect();

            let result = storage.filter_by_primary_keys(&kind, &asked_refs).unwrap();
            let got: Vec<PrimaryKey> = result.iter().map(|e| e.pk.clone()).collect();
            let expected: Vec<PrimaryKey> = stored
                .intersection(&asked)
                .map(|k| PrimaryKey::Integer(*k))
                .collect();
            prop_assert_eq!(got, expected);
        }
    }
}
