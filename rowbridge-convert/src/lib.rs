//! Rowbridge Convert - Field Converters for Import/Export Rows
//!
//! Turns the text cells of an external table into typed internal values and
//! back. Scalar converters are pure. Reference converters resolve
//! identifiers against an [`EntityStore`](rowbridge_storage::EntityStore),
//! caching every outcome (misses included) in a
//! [`CacheBackend`](rowbridge_storage::CacheBackend) so a session that names
//! the same entity on many rows queries storage once.
//!
//! # Example
//!
//! ```ignore
//! let context = ConversionContext::new(Arc::new(storage), Arc::new(InMemoryCache::new()));
//! let mapping = MappingConfig::from_toml_str(source)?;
//! let converters = FieldConverters::from_mapping(&mapping, &context)?;
//!
//! let category = converters.clean("category", Some("Widgets"))?;
//! let text = converters.render("category", &category)?;
//! ```

pub mod converter;
pub mod reference;
pub mod reference_set;
pub mod registry;
pub mod scalar;

pub use converter::{CleanOutcome, ConversionContext, Converter};
pub use reference::{ReferenceConverter, Resolution, UnresolvedReason, UnresolvedReference};
pub use reference_set::{ReferenceSetConverter, DELIMITER};
pub use registry::FieldConverters;
pub use scalar::{
    BooleanConverter, DateConverter, DateTimeConverter, DecimalConverter, IntegerConverter,
    TextConverter,
};
