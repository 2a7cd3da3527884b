//! Rowbridge Test Utilities
//!
//! Shared test infrastructure for the rowbridge workspace:
//! - Proptest generators for values the converters round-trip
//! - Fixtures: a small catalog in `MockStorage`
//! - Collaborators that always fail, for propagation tests
//! - Custom assertions for rowbridge error variants
//! - Test tracing setup

// Re-export in-memory collaborators from their source crate
pub use rowbridge_storage::{InMemoryCache, MockStorage};

// Re-export core types for convenience
pub use rowbridge_core::{
    CacheError, ConfigError, ConvertError, Entity, EntityKind, EntityRef, EntitySchema,
    InternalValue, KeyType, Lookup, PrimaryKey, RowbridgeError, RowbridgeResult, StorageError,
    ValueKind,
};

use rowbridge_storage::{CacheBackend, CachedValue, EntityStore};
use tracing_subscriber::EnvFilter;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-writer subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for converter inputs.

    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;
    use std::str::FromStr;
    use uuid::Uuid;

    /// A valid calendar date with a four-digit year.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (1000i32..=9999, 1u32..=12, 1u32..=31)
            .prop_filter_map("not a calendar date", |(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
            })
    }

    /// A datetime with whole-second precision.
    pub fn arb_datetime() -> impl Strategy<Value = NaiveDateTime> {
        (arb_date(), 0u32..24, 0u32..60, 0u32..60)
            .prop_filter_map("not a time of day", |(date, h, m, s)| date.and_hms_opt(h, m, s))
    }

    /// Canonical decimal text: optional sign, no leading zeros, and an
    /// optional fraction. Digit counts run well past 28 significant digits.
    pub fn arb_decimal_text() -> impl Strategy<Value = String> {
        "-?(0|[1-9][0-9]{0,60})(\\.[0-9]{1,60})?"
    }

    /// A decimal parsed from [`arb_decimal_text`], scale included.
    pub fn arb_decimal() -> impl Strategy<Value = BigDecimal> {
        arb_decimal_text().prop_filter_map("not decimal text", |text| {
            BigDecimal::from_str(&text).ok()
        })
    }

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// An external identifier: letters, digits and interior spaces.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ]{0,15}"
    }

    /// An identifier that can never parse as an integer key.
    pub fn arb_label() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z ]{0,15}"
    }

    pub fn arb_entity_kind() -> impl Strategy<Value = EntityKind> {
        ("[a-z]{1,8}", "[A-Z][a-z]{0,8}").prop_map(|(app, model)| EntityKind::new(app, model))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! A small catalog: titled categories and untitled tags.

    use super::*;

    pub const CATEGORY_TITLES: [(i64, &str); 3] = [(5, "Gadgets"), (7, "Tools"), (42, "Widgets")];
    pub const TAG_KEYS: [i64; 5] = [1, 2, 3, 5, 7];

    /// `catalog.Category`: integer keys, has a `title`.
    pub fn category_kind() -> EntityKind {
        EntityKind::new("catalog", "Category")
    }

    /// `catalog.Tag`: integer keys, no attributes.
    pub fn tag_kind() -> EntityKind {
        EntityKind::new("catalog", "Tag")
    }

    /// `auth.User`: UUID keys, has a `title`.
    pub fn user_kind() -> EntityKind {
        EntityKind::new("auth", "User")
    }

    pub fn category(pk: i64, title: &str) -> Entity {
        Entity::new(category_kind(), pk).with_attribute("title", title)
    }

    /// Storage with all three kinds registered, categories and tags inserted.
    pub fn catalog_storage() -> MockStorage {
        let storage = MockStorage::new();
        storage
            .register(EntitySchema::new(category_kind(), KeyType::Integer).with_attribute("title"))
            .expect("register category");
        storage
            .register(EntitySchema::new(tag_kind(), KeyType::Integer))
            .expect("register tag");
        storage
            .register(EntitySchema::new(user_kind(), KeyType::Uuid).with_attribute("title"))
            .expect("register user");

        for (pk, title) in CATEGORY_TITLES {
            storage.insert(category(pk, title)).expect("insert category");
        }
        for pk in TAG_KEYS {
            storage.insert(Entity::new(tag_kind(), pk)).expect("insert tag");
        }
        storage
    }
}

// ============================================================================
// FAILING COLLABORATORS
// ============================================================================

/// An entity store whose every call fails as unavailable.
#[derive(Debug, Clone)]
pub struct FailingStore {
    reason: String,
}

impl FailingStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> RowbridgeResult<T> {
        Err(StorageError::Unavailable {
            reason: self.reason.clone(),
        }
        .into())
    }
}

impl EntityStore for FailingStore {
    fn get_by_primary_key(&self, _kind: &EntityKind, _key: &str) -> RowbridgeResult<Lookup> {
        self.fail()
    }

    fn get_by_attribute(
        &self,
        _kind: &EntityKind,
        _attribute: &str,
        _value: &str,
    ) -> RowbridgeResult<Lookup> {
        self.fail()
    }

    fn attribute_exists(&self, _kind: &EntityKind, _attribute: &str) -> RowbridgeResult<bool> {
        self.fail()
    }

    fn filter_by_primary_keys(
        &self,
        _kind: &EntityKind,
        _keys: &[&str],
    ) -> RowbridgeResult<Vec<EntityRef>> {
        self.fail()
    }
}

/// A cache that fails as unavailable.
///
/// By default both reads and writes fail; [`FailingCache::writes_only`]
/// misses on every read and fails only on write.
#[derive(Debug, Clone)]
pub struct FailingCache {
    reason: String,
    fail_reads: bool,
}

impl FailingCache {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fail_reads: true,
        }
    }

    pub fn writes_only(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fail_reads: false,
        }
    }

    fn fail<T>(&self) -> RowbridgeResult<T> {
        Err(CacheError::Unavailable {
            reason: self.reason.clone(),
        }
        .into())
    }
}

impl CacheBackend for FailingCache {
    fn get(&self, _key: &str) -> RowbridgeResult<Option<CachedValue>> {
        if self.fail_reads {
            self.fail()
        } else {
            Ok(None)
        }
    }

    fn set(&self, _key: &str, _value: CachedValue) -> RowbridgeResult<()> {
        self.fail()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for rowbridge-specific validation.

    use super::*;

    /// Assert that a RowbridgeResult is a Format conversion error.
    #[track_caller]
    pub fn assert_format_error<T: std::fmt::Debug>(result: &RowbridgeResult<T>) {
        match result {
            Err(RowbridgeError::Convert(ConvertError::Format { .. })) => {}
            other => panic!("Expected Format error, got: {:?}", other),
        }
    }

    /// Assert that a RowbridgeResult is a TypeMismatch from `converter`.
    #[track_caller]
    pub fn assert_type_mismatch<T: std::fmt::Debug>(
        result: &RowbridgeResult<T>,
        converter: &str,
        found: ValueKind,
    ) {
        match result {
            Err(RowbridgeError::Convert(ConvertError::TypeMismatch {
                converter: c,
                found: f,
            })) => {
                assert_eq!(*c, converter, "Wrong converter in TypeMismatch");
                assert_eq!(*f, found, "Wrong value kind in TypeMismatch");
            }
            other => panic!("Expected TypeMismatch from {}, got: {:?}", converter, other),
        }
    }

    /// Assert that a RowbridgeResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &RowbridgeResult<T>) {
        match result {
            Err(RowbridgeError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a RowbridgeResult is a Cache error.
    #[track_caller]
    pub fn assert_cache_error<T: std::fmt::Debug>(result: &RowbridgeResult<T>) {
        match result {
            Err(RowbridgeError::Cache(_)) => {}
            other => panic!("Expected Cache error, got: {:?}", other),
        }
    }

    /// Assert that a RowbridgeResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &RowbridgeResult<T>) {
        match result {
            Err(RowbridgeError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a value is a reference to the entity with primary key `pk`.
    #[track_caller]
    pub fn assert_reference_to(value: &InternalValue, pk: impl Into<PrimaryKey>) {
        let pk = pk.into();
        match value {
            InternalValue::Reference(entity) => {
                assert_eq!(entity.pk, pk, "Reference points at the wrong entity")
            }
            other => panic!("Expected reference to {}, got: {:?}", pk, other),
        }
    }

    /// Assert that a value is a reference set with exactly these keys, in order.
    #[track_caller]
    pub fn assert_reference_set(value: &InternalValue, pks: &[i64]) {
        match value {
            InternalValue::ReferenceSet(entities) => {
                let got: Vec<PrimaryKey> = entities.iter().map(|e| e.pk.clone()).collect();
                let expected: Vec<PrimaryKey> = pks.iter().map(|pk| PrimaryKey::Integer(*pk)).collect();
                assert_eq!(got, expected, "Wrong entities in reference set");
            }
            other => panic!("Expected reference set {:?}, got: {:?}", pks, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_catalog_storage_fixture() {
        let storage = fixtures::catalog_storage();
        assert_eq!(storage.entity_count(&fixtures::category_kind()), 3);
        assert_eq!(storage.entity_count(&fixtures::tag_kind()), 5);
        assert_eq!(storage.entity_count(&fixtures::user_kind()), 0);
        assert!(storage
            .attribute_exists(&fixtures::category_kind(), "title")
            .unwrap());
        assert!(!storage.attribute_exists(&fixtures::tag_kind(), "title").unwrap());
    }

    #[test]
    fn test_failing_store() {
        let store = FailingStore::new("down");
        assertions::assert_storage_error(
            &store.get_by_primary_key(&fixtures::category_kind(), "1"),
        );
        assertions::assert_storage_error(
            &store.filter_by_primary_keys(&fixtures::tag_kind(), &["1"]),
        );
    }

    #[test]
    fn test_failing_cache_modes() {
        let cache = FailingCache::new("down");
        assertions::assert_cache_error(&cache.get("k"));

        let cache = FailingCache::writes_only("read-only");
        assert_eq!(cache.get("k").unwrap(), None);
        assertions::assert_cache_error(&cache.set("k", CachedValue::Missing));
        assert_eq!(cache.stats().unwrap(), Default::default());
    }

    #[test]
    fn test_assertion_reference_helpers() {
        let entity = Arc::new(fixtures::category(42, "Widgets"));
        assertions::assert_reference_to(&InternalValue::Reference(entity.clone()), 42);

        let tag = Arc::new(Entity::new(fixtures::tag_kind(), 3));
        assertions::assert_reference_set(&InternalValue::ReferenceSet(vec![tag]), &[3]);
    }

    #[test]
    fn test_assertion_type_mismatch() {
        let result: RowbridgeResult<String> = Err(RowbridgeError::Convert(
            ConvertError::TypeMismatch {
                converter: "date",
                found: ValueKind::Integer,
            },
        ));
        assertions::assert_type_mismatch(&result, "date", ValueKind::Integer);
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_kind_parses_back(kind in generators::arb_entity_kind()) {
            let parsed: EntityKind = kind.to_string().parse().unwrap();
            prop_assert_eq!(parsed, kind);
        }

        #[test]
        fn prop_generated_label_is_never_an_integer_key(label in generators::arb_label()) {
            prop_assert!(KeyType::Integer.parse(&label).is_none());
        }
    }
}
