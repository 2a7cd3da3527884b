//! Reference resolution: external identifier to one live entity.
//!
//! Resolution is cache-aside. The cache is consulted first; on a miss the
//! identifier is tried as a primary key, and when it cannot be a key at all
//! it is tried as the value of the kind's label attribute (`title` unless
//! configured otherwise). Whatever comes out, found or not, is written back
//! to the cache so the next row naming the same identifier skips storage.
//!
//! A miss is not an error. [`ReferenceConverter::clean`] turns it into
//! `Null`; [`ReferenceConverter::resolve`] keeps it as
//! [`Resolution::Unresolved`] so callers can report it per record.
//! Storage and cache failures propagate unchanged.

use std::fmt;
use std::sync::Arc;

use rowbridge_core::{
    EntityKind, EntityRef, InternalValue, Lookup, RowbridgeResult, DEFAULT_LABEL_ATTRIBUTE,
};
use rowbridge_storage::{CacheBackend, CacheKey, CachedValue, EntityStore};
use tracing::{debug, instrument, warn};

use crate::scalar::{mismatch, present};

/// Why an identifier did not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnresolvedReason {
    /// Storage conclusively matched nothing.
    NotFound,
    /// The identifier was not a valid key and the kind has no label attribute.
    NoLabelAttribute,
    /// A previous resolution in this session already found nothing.
    CachedMiss,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UnresolvedReason::NotFound => "not found",
            UnresolvedReason::NoLabelAttribute => "not a key and no label attribute",
            UnresolvedReason::CachedMiss => "not found (cached)",
        };
        write!(f, "{}", value)
    }
}

/// An identifier that named no entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub kind: EntityKind,
    /// The identifier exactly as it appeared in the external value.
    pub identifier: String,
    pub reason: UnresolvedReason,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unresolved {} reference {:?}: {}",
            self.kind, self.identifier, self.reason
        )
    }
}

/// Outcome of resolving one external identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The external value was absent or empty; nothing was looked up.
    Absent,
    Resolved(EntityRef),
    Unresolved(UnresolvedReference),
}

impl Resolution {
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            Resolution::Resolved(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn unresolved(&self) -> Option<&UnresolvedReference> {
        match self {
            Resolution::Unresolved(unresolved) => Some(unresolved),
            _ => None,
        }
    }

    /// Collapse to the plain `clean` result: the entity, or `Null`.
    pub fn into_value(self) -> InternalValue {
        match self {
            Resolution::Resolved(entity) => InternalValue::Reference(entity),
            Resolution::Absent | Resolution::Unresolved(_) => InternalValue::Null,
        }
    }
}

/// Resolves a single external identifier to one entity of a fixed kind.
#[derive(Clone)]
pub struct ReferenceConverter {
    kind: EntityKind,
    label_attribute: String,
    store: Arc<dyn EntityStore>,
    cache: Arc<dyn CacheBackend>,
}

impl fmt::Debug for ReferenceConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceConverter")
            .field("kind", &self.kind)
            .field("label_attribute", &self.label_attribute)
            .finish_non_exhaustive()
    }
}

impl ReferenceConverter {
    pub fn new(kind: EntityKind, store: Arc<dyn EntityStore>, cache: Arc<dyn CacheBackend>) -> Self {
        Self {
            kind,
            label_attribute: DEFAULT_LABEL_ATTRIBUTE.to_string(),
            store,
            cache,
        }
    }

    /// Use `attribute` instead of `title` for the fallback lookup.
    pub fn with_label_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.label_attribute = attribute.into();
        self
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn label_attribute(&self) -> &str {
        &self.label_attribute
    }

    /// Resolve and collapse to a value: the entity, or `Null` when absent or
    /// unresolved.
    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        self.resolve(external).map(Resolution::into_value)
    }

    /// Resolve an external identifier, keeping "unresolved" distinct from
    /// "absent".
    #[instrument(level = "debug", skip(self), fields(entity = %self.kind))]
    pub fn resolve(&self, external: Option<&str>) -> RowbridgeResult<Resolution> {
        let Some(raw) = present(external) else {
            return Ok(Resolution::Absent);
        };
        let key = CacheKey::for_raw(&self.kind, raw);

        if let Some(cached) = self.cache.get(key.as_str())? {
            debug!(cache_key = %key, "reference cache hit");
            return Ok(match cached {
                CachedValue::Entity(entity) => Resolution::Resolved(entity),
                CachedValue::Missing => self.unresolved(raw, UnresolvedReason::CachedMiss),
            });
        }
        debug!(cache_key = %key, "reference cache miss");

        let resolution = self.lookup(&key, raw)?;

        let cached = match &resolution {
            Resolution::Resolved(entity) => CachedValue::Entity(entity.clone()),
            Resolution::Absent | Resolution::Unresolved(_) => CachedValue::Missing,
        };
        self.cache.set(key.as_str(), cached)?;
        debug!(cache_key = %key, "cached reference outcome");

        if let Some(unresolved) = resolution.unresolved() {
            warn!(identifier = raw, reason = %unresolved.reason, "unresolved reference");
        }
        Ok(resolution)
    }

    /// Primary-key lookup on the normalized identifier, falling back to the
    /// label attribute (compared against the raw text) for malformed keys.
    fn lookup(&self, key: &CacheKey, raw: &str) -> RowbridgeResult<Resolution> {
        match self.store.get_by_primary_key(&self.kind, key.identifier())? {
            Lookup::Found(entity) => Ok(Resolution::Resolved(entity)),
            Lookup::NotFound => Ok(self.unresolved(raw, UnresolvedReason::NotFound)),
            Lookup::MalformedKey => {
                if !self.store.attribute_exists(&self.kind, &self.label_attribute)? {
                    debug!(
                        attribute = %self.label_attribute,
                        "identifier is not a key and kind has no label attribute"
                    );
                    return Ok(self.unresolved(raw, UnresolvedReason::NoLabelAttribute));
                }
                debug!(attribute = %self.label_attribute, "falling back to label lookup");
                match self
                    .store
                    .get_by_attribute(&self.kind, &self.label_attribute, raw)?
                {
                    Lookup::Found(entity) => Ok(Resolution::Resolved(entity)),
                    Lookup::NotFound | Lookup::MalformedKey => {
                        Ok(self.unresolved(raw, UnresolvedReason::NotFound))
                    }
                }
            }
        }
    }

    fn unresolved(&self, raw: &str, reason: UnresolvedReason) -> Resolution {
        Resolution::Unresolved(UnresolvedReference {
            kind: self.kind.clone(),
            identifier: raw.to_string(),
            reason,
        })
    }

    /// The entity's primary key, or empty text for `Null`.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::Reference(entity) => Ok(entity.pk.to_string()),
            other => Err(mismatch("reference", other)),
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rowbridge_core::{Entity, EntitySchema, KeyType, PrimaryKey};
    use rowbridge_storage::{InMemoryCache, MockStorage};
    use rowbridge_test_utils::fixtures;
    use rowbridge_test_utils::generators::{arb_identifier, arb_uuid};

    fn converter_for(
        kind: EntityKind,
        storage: &MockStorage,
        cache: &InMemoryCache,
    ) -> ReferenceConverter {
        ReferenceConverter::new(kind, Arc::new(storage.clone()), Arc::new(cache.clone()))
    }

    /// Insert a space after each digit whose flag is set, and pad both ends.
    fn spaced(digits: &str, flags: &[bool]) -> String {
        let mut out = String::from(" \t");
        for (ch, space) in digits.chars().zip(flags.iter().chain(std::iter::repeat(&false))) {
            out.push(ch);
            if *space {
                out.push(' ');
            }
        }
        out.push('\n');
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: every whitespace variant of a key resolves to the same
        /// entity with a single storage query
        #[test]
        fn prop_whitespace_variants_share_one_lookup(
            pk in 0i64..1_000_000,
            flags in prop::collection::vec(any::<bool>(), 0..8)
        ) {
            let storage = MockStorage::new();
            storage
                .register(EntitySchema::new(fixtures::category_kind(), KeyType::Integer))
                .unwrap();
            storage.insert(Entity::new(fixtures::category_kind(), pk)).unwrap();
            let cache = InMemoryCache::new();
            let c = converter_for(fixtures::category_kind(), &storage, &cache);

            let plain = pk.to_string();
            let variant = spaced(&plain, &flags);
            for raw in [plain.as_str(), variant.as_str()] {
                let resolution = c.resolve(Some(raw)).unwrap();
                prop_assert_eq!(
                    resolution.entity().map(|e| e.pk.clone()),
                    Some(PrimaryKey::Integer(pk))
                );
            }
            prop_assert_eq!(storage.total_queries(), 1);
        }

        /// Property: once an identifier has been resolved, repeating it or a
        /// whitespace variant of it never queries storage again
        #[test]
        fn prop_repeat_never_queries_storage(id in arb_identifier()) {
            let storage = fixtures::catalog_storage();
            let cache = InMemoryCache::new();
            let c = converter_for(fixtures::category_kind(), &storage, &cache);

            let first = c.resolve(Some(&id)).unwrap();
            let queries = storage.total_queries();
            prop_assert!(queries >= 1);

            let padded = format!("  {}\t", id);
            let squeezed = id.replace(' ', "");
            for raw in [id.as_str(), padded.as_str(), squeezed.as_str()] {
                let again = c.resolve(Some(raw)).unwrap();
                prop_assert_eq!(again.entity(), first.entity());
                prop_assert_eq!(again.unresolved().is_some(), first.unresolved().is_some());
            }
            prop_assert_eq!(storage.total_queries(), queries);
        }

        /// Property: a UUID-keyed kind resolves any stored UUID by its text
        #[test]
        fn prop_uuid_key_resolves(id in arb_uuid()) {
            let storage = fixtures::catalog_storage();
            storage.insert(Entity::new(fixtures::user_kind(), id)).unwrap();
            let cache = InMemoryCache::new();
            let c = converter_for(fixtures::user_kind(), &storage, &cache);

            let resolution = c.resolve(Some(&id.to_string())).unwrap();
            prop_assert_eq!(
                resolution.entity().map(|e| e.pk.clone()),
                Some(PrimaryKey::Uuid(id))
            );
            prop_assert_eq!(storage.attribute_checks(), 0);
        }
    }
}
