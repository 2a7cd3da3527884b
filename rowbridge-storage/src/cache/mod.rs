//! Cache layer for resolved references.
//!
//! The cache is advisory: it may hand back a value that no longer matches
//! storage, and callers accept that. It is always passed in explicitly so
//! tests can substitute their own backend and count calls.
//!
//! # Example
//!
//! ```ignore
//! let cache = InMemoryCache::new();
//! let key = CacheKey::for_raw(&kind, " 42 ");
//! cache.set(key.as_str(), CachedValue::Missing)?;
//! assert_eq!(cache.get(key.as_str())?, Some(CachedValue::Missing));
//! ```

pub mod key;
pub mod memory;
pub mod traits;

pub use key::{normalize_identifier, CacheKey};
pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use traits::{CacheBackend, CacheStats, CachedValue};
