//! Error types for rowbridge operations

use crate::{EntityKind, ValueKind};
use thiserror::Error;

/// Conversion errors raised by converters themselves.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Invalid {expected} value {value:?}: {reason}")]
    Format {
        expected: ValueKind,
        value: String,
        reason: String,
    },

    #[error("{converter} converter cannot render a {found} value")]
    TypeMismatch {
        converter: &'static str,
        found: ValueKind,
    },
}

/// Entity storage errors.
///
/// Single-entity misses and malformed keys are not errors; see [`crate::Lookup`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Malformed primary key {key:?} for {kind}")]
    MalformedKey { kind: EntityKind, key: String },

    #[error("Unknown entity kind: {kind}")]
    UnknownKind { kind: EntityKind },

    #[error("Unknown attribute {attribute} on {kind}")]
    UnknownAttribute { kind: EntityKind, attribute: String },

    #[error("{count} {kind} entities have {attribute} = {value:?}")]
    AmbiguousAttribute {
        kind: EntityKind,
        attribute: String,
        value: String,
        count: usize,
    },

    #[error("Insert failed for {kind}: {reason}")]
    InsertFailed { kind: EntityKind, reason: String },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    #[error("Field configured more than once: {name}")]
    DuplicateField { name: String },
}

/// Master error type for all rowbridge errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowbridgeError {
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for rowbridge operations.
pub type RowbridgeResult<T> = Result<T, RowbridgeError>;

// =============================================================================
// TESTS
// =============================================================================
