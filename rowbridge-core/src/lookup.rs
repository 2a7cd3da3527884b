//! Explicit outcome of a single-entity storage lookup

use crate::EntityRef;

/// Result of asking storage for one entity.
///
/// `NotFound` and `MalformedKey` are ordinary outcomes, not errors: the
/// reference converter branches on them. Infrastructure failures travel
/// separately as `Err(RowbridgeError)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(EntityRef),
    /// The lookup ran and conclusively matched nothing.
    NotFound,
    /// The token cannot be interpreted as a primary key of the entity kind.
    MalformedKey,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// The entity, if one was found.
    pub fn found(self) -> Option<EntityRef> {
        match self {
            Lookup::Found(entity) => Some(entity),
            Lookup::NotFound | Lookup::MalformedKey => None,
        }
    }
}

impl From<Option<EntityRef>> for Lookup {
    fn from(value: Option<EntityRef>) -> Self {
        match value {
            Some(entity) => Lookup::Found(entity),
            None => Lookup::NotFound,
        }
    }
}
