//! Typed in-memory values produced by `clean` and consumed by `render`

use crate::EntityRef;
use chrono::{NaiveDate, NaiveDateTime};
use bigdecimal::BigDecimal;
use std::fmt;

/// The typed form of a field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InternalValue {
    /// No value (an absent or empty external value on import).
    #[default]
    Null,
    Integer(i64),
    /// Arbitrary precision; the scale is kept, so `1.50` stays `1.50`.
    Decimal(BigDecimal),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Reference(EntityRef),
    /// Ordered collection of references. Empty means "no related entities".
    ReferenceSet(Vec<EntityRef>),
}

impl InternalValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            InternalValue::Null => ValueKind::Null,
            InternalValue::Integer(_) => ValueKind::Integer,
            InternalValue::Decimal(_) => ValueKind::Decimal,
            InternalValue::Text(_) => ValueKind::Text,
            InternalValue::Boolean(_) => ValueKind::Boolean,
            InternalValue::Date(_) => ValueKind::Date,
            InternalValue::DateTime(_) => ValueKind::DateTime,
            InternalValue::Reference(_) => ValueKind::Reference,
            InternalValue::ReferenceSet(_) => ValueKind::ReferenceSet,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, InternalValue::Null)
    }

    pub fn as_reference(&self) -> Option<&EntityRef> {
        match self {
            InternalValue::Reference(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_reference_set(&self) -> Option<&[EntityRef]> {
        match self {
            InternalValue::ReferenceSet(entities) => Some(entities),
            _ => None,
        }
    }
}

/// Best-effort textual form of any value.
///
/// References display as their primary key; reference sets as comma-joined
/// keys; `Null` as the empty string.
impl fmt::Display for InternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalValue::Null => Ok(()),
            InternalValue::Integer(value) => write!(f, "{}", value),
            InternalValue::Decimal(value) => f.write_str(&value.to_plain_string()),
            InternalValue::Text(value) => f.write_str(value),
            InternalValue::Boolean(value) => write!(f, "{}", value),
            InternalValue::Date(value) => write!(f, "{}", value),
            InternalValue::DateTime(value) => write!(f, "{}", value),
            InternalValue::Reference(entity) => write!(f, "{}", entity.pk),
            InternalValue::ReferenceSet(entities) => {
                for (i, entity) in entities.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", entity.pk)?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for InternalValue {
    fn from(value: i64) -> Self {
        InternalValue::Integer(value)
    }
}

impl From<BigDecimal> for InternalValue {
    fn from(value: BigDecimal) -> Self {
        InternalValue::Decimal(value)
    }
}

impl From<bool> for InternalValue {
    fn from(value: bool) -> Self {
        InternalValue::Boolean(value)
    }
}

impl From<String> for InternalValue {
    fn from(value: String) -> Self {
        InternalValue::Text(value)
    }
}

impl From<NaiveDate> for InternalValue {
    fn from(value: NaiveDate) -> Self {
        InternalValue::Date(value)
    }
}

impl From<NaiveDateTime> for InternalValue {
    fn from(value: NaiveDateTime) -> Self {
        InternalValue::DateTime(value)
    }
}

impl From<EntityRef> for InternalValue {
    fn from(value: EntityRef) -> Self {
        InternalValue::Reference(value)
    }
}

impl<T: Into<InternalValue>> From<Option<T>> for InternalValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(InternalValue::Null)
    }
}

/// Discriminant of [`InternalValue`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Integer,
    Decimal,
    Text,
    Boolean,
    Date,
    DateTime,
    Reference,
    ReferenceSet,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ValueKind::Null => "null",
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::DateTime => "datetime",
            ValueKind::Reference => "reference",
            ValueKind::ReferenceSet => "reference set",
        };
        write!(f, "{}", value)
    }
}
