//! Rowbridge Core - Value and Entity Types
//!
//! Pure data structures shared by the storage collaborators and the
//! converters: entity identity, typed internal values, lookup outcomes,
//! errors and configuration. No conversion logic lives here.

pub mod config;
pub mod error;
pub mod identity;
pub mod lookup;
pub mod value;

pub use config::{
    ConversionDefaults, ConverterConfig, FieldConfig, MappingConfig, DEFAULT_DATETIME_FORMAT,
    DEFAULT_DATE_FORMAT, DEFAULT_FALSE_VALUE, DEFAULT_LABEL_ATTRIBUTE, DEFAULT_TRUE_VALUE,
};
pub use error::{
    CacheError, ConfigError, ConvertError, RowbridgeError, RowbridgeResult, StorageError,
};
pub use identity::{Entity, EntityKind, EntityRef, EntitySchema, KeyType, PrimaryKey};
pub use lookup::Lookup;
pub use value::{InternalValue, ValueKind};

/// Re-exported so downstream crates name the same decimal and date types.
pub use chrono::{NaiveDate, NaiveDateTime};
pub use bigdecimal::BigDecimal;
