//! Cache keys for resolved references.
//!
//! A key is the entity kind's namespace followed by the normalized
//! identifier, concatenated as plain text with no escaping.
//!
//! Underscores in app labels, model names or identifiers can make two
//! distinct keys encode to the same string: `a_b.c` and `a.b_c` share the
//! namespace `a_b_c_`, and `catalog.Tag` with identifier `group_5` encodes
//! like `catalog.Tag_Group` with identifier `5`. Kinds whose names can
//! collide this way must not share a cache backend.

use rowbridge_core::EntityKind;

/// Strip every whitespace character from a raw identifier.
///
/// This is the only normalization applied before keying the cache.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A cache key scoped to one entity kind.
///
/// Can only be built from an [`EntityKind`] and an identifier, so every key
/// carries its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    kind: EntityKind,
    identifier: String,
    encoded: String,
}

impl CacheKey {
    /// Build the key for an already-normalized identifier.
    pub fn new(kind: &EntityKind, normalized_identifier: impl Into<String>) -> Self {
        let identifier = normalized_identifier.into();
        let encoded = format!("{}{}", kind.namespace(), identifier);
        Self {
            inner: CacheKeyInner {
                kind: kind.clone(),
                identifier,
                encoded,
            },
        }
    }

    /// Normalize `raw` and build its key.
    pub fn for_raw(kind: &EntityKind, raw: &str) -> Self {
        Self::new(kind, normalize_identifier(raw))
    }

    pub fn kind(&self) -> &EntityKind {
        &self.inner.kind
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    /// The opaque string handed to the cache backend.
    pub fn as_str(&self) -> &str {
        &self.inner.encoded
    }

    /// Prefix shared by every key of `kind`.
    pub fn kind_prefix(kind: &EntityKind) -> String {
        kind.namespace()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category() -> EntityKind {
        EntityKind::new("catalog", "Category")
    }

    #[test]
    fn test_normalize_strips_all_whitespace() {
        assert_eq!(normalize_identifier(" 4 2 "), "42");
        assert_eq!(normalize_identifier("Blue\tWidgets\n"), "BlueWidgets");
        assert_eq!(normalize_identifier("plain"), "plain");
    }

    #[test]
    fn test_key_is_namespace_plus_identifier() {
        let key = CacheKey::for_raw(&category(), " 42");
        assert_eq!(key.as_str(), "catalog_category_42");
        assert_eq!(key.identifier(), "42");
        assert_eq!(key.kind(), &category());
        assert!(key.as_str().starts_with(&CacheKey::kind_prefix(&category())));
    }

    #[test]
    fn test_keys_of_different_kinds_differ() {
        let a = CacheKey::new(&category(), "1");
        let b = CacheKey::new(&EntityKind::new("catalog", "Tag"), "1");
        assert_ne!(a, b);
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_underscored_names_can_share_an_encoding() {
        let left = EntityKind::new("a_b", "c");
        let right = EntityKind::new("a", "b_c");
        assert_eq!(CacheKey::kind_prefix(&left), CacheKey::kind_prefix(&right));

        let tag = CacheKey::new(&EntityKind::new("catalog", "Tag"), "group_5");
        let group = CacheKey::new(&EntityKind::new("catalog", "Tag_Group"), "5");
        assert_eq!(tag.as_str(), group.as_str());
        // The typed keys still tell them apart.
        assert_ne!(tag, group);
    }
}
