//! Comma-separated primary keys to a set of entities.

use std::fmt;
use std::sync::Arc;

use rowbridge_core::{EntityKind, InternalValue, RowbridgeResult};
use rowbridge_storage::EntityStore;
use tracing::debug;

use crate::scalar::{mismatch, present};

/// Separator between keys in the external form.
pub const DELIMITER: char = ',';

/// Resolves a delimited list of primary keys with one batch query.
///
/// No cache is involved, keys are not trimmed, and unknown keys are
/// silently dropped. A token that cannot be a key of the kind is a storage
/// error and propagates.
#[derive(Clone)]
pub struct ReferenceSetConverter {
    kind: EntityKind,
    store: Arc<dyn EntityStore>,
}

impl fmt::Debug for ReferenceSetConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceSetConverter")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ReferenceSetConverter {
    pub fn new(kind: EntityKind, store: Arc<dyn EntityStore>) -> Self {
        Self { kind, store }
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        let Some(text) = present(external) else {
            return Ok(InternalValue::ReferenceSet(Vec::new()));
        };

        let mut keys: Vec<&str> = Vec::new();
        for token in text.split(DELIMITER) {
            if !keys.contains(&token) {
                keys.push(token);
            }
        }

        let entities = self.store.filter_by_primary_keys(&self.kind, &keys)?;
        debug!(
            entity = %self.kind,
            requested = keys.len(),
            matched = entities.len(),
            "resolved reference set"
        );
        Ok(InternalValue::ReferenceSet(entities))
    }

    /// Primary keys joined by [`DELIMITER`], in the set's order.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match value {
            InternalValue::Null => Ok(String::new()),
            InternalValue::ReferenceSet(entities) => Ok(entities
                .iter()
                .map(|e| e.pk.to_string())
                .collect::<Vec<_>>()
                .join(&DELIMITER.to_string())),
            other => Err(mismatch("reference set", other)),
        }
    }
}
