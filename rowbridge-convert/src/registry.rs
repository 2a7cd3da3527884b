//! Field-name to converter registry for one mapping.

use rowbridge_core::{ConfigError, InternalValue, MappingConfig, RowbridgeResult};
use tracing::debug;

use crate::converter::{CleanOutcome, ConversionContext, Converter};

/// The converters of one mapping, in configuration order.
///
/// Built once per session; every reference converter in it shares the
/// context's store and cache.
#[derive(Debug, Clone, Default)]
pub struct FieldConverters {
    fields: Vec<(String, Converter)>,
}

impl FieldConverters {
    /// Validate `mapping` and build a converter for each field.
    pub fn from_mapping(
        mapping: &MappingConfig,
        context: &ConversionContext,
    ) -> RowbridgeResult<Self> {
        mapping.validate()?;

        let mut fields = Vec::with_capacity(mapping.fields.len());
        for field in &mapping.fields {
            let converter =
                Converter::build(&field.converter, &mapping.defaults, context, &field.name)?;
            fields.push((field.name.clone(), converter));
        }
        debug!(fields = fields.len(), "built field converters");
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&Converter> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, converter)| converter)
    }

    /// Like [`Self::get`], but an unknown name is an error.
    pub fn converter(&self, name: &str) -> RowbridgeResult<&Converter> {
        self.get(name).ok_or_else(|| {
            ConfigError::UnknownField {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn clean(&self, name: &str, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        self.converter(name)?.clean(external)
    }

    pub fn clean_checked(&self, name: &str, external: Option<&str>) -> RowbridgeResult<CleanOutcome> {
        self.converter(name)?.clean_checked(external)
    }

    pub fn render(&self, name: &str, value: &InternalValue) -> RowbridgeResult<String> {
        self.converter(name)?.render(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Converter)> {
        self.fields.iter().map(|(name, c)| (name.as_str(), c))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
