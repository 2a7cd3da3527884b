//! The closed set of field converters.

use std::sync::Arc;

use rowbridge_core::{ConversionDefaults, ConverterConfig, InternalValue, RowbridgeResult};
use rowbridge_storage::{CacheBackend, EntityStore};

use crate::reference::{ReferenceConverter, UnresolvedReference};
use crate::reference_set::ReferenceSetConverter;
use crate::scalar::{
    BooleanConverter, DateConverter, DateTimeConverter, DecimalConverter, IntegerConverter,
    TextConverter,
};

/// Collaborators shared by every converter of one session.
#[derive(Clone)]
pub struct ConversionContext {
    pub store: Arc<dyn EntityStore>,
    pub cache: Arc<dyn CacheBackend>,
}

impl ConversionContext {
    pub fn new(store: Arc<dyn EntityStore>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { store, cache }
    }
}

impl std::fmt::Debug for ConversionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionContext").finish_non_exhaustive()
    }
}

/// Result of [`Converter::clean_checked`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    pub value: InternalValue,
    /// Set when a single-reference identifier named no entity.
    pub unresolved: Option<UnresolvedReference>,
}

impl From<InternalValue> for CleanOutcome {
    fn from(value: InternalValue) -> Self {
        Self {
            value,
            unresolved: None,
        }
    }
}

/// A bidirectional converter for one field.
#[derive(Debug, Clone)]
pub enum Converter {
    Integer(IntegerConverter),
    Decimal(DecimalConverter),
    Text(TextConverter),
    Boolean(BooleanConverter),
    Date(DateConverter),
    DateTime(DateTimeConverter),
    Reference(ReferenceConverter),
    ReferenceSet(ReferenceSetConverter),
}

impl Converter {
    /// Build a converter from its configuration, filling unset options from
    /// `defaults`. The configuration is validated first.
    pub fn from_config(
        config: &ConverterConfig,
        defaults: &ConversionDefaults,
        context: &ConversionContext,
    ) -> RowbridgeResult<Self> {
        Self::build(config, defaults, context, "converter")
    }

    pub(crate) fn build(
        config: &ConverterConfig,
        defaults: &ConversionDefaults,
        context: &ConversionContext,
        field: &str,
    ) -> RowbridgeResult<Self> {
        config.validate(field, defaults)?;

        Ok(match config {
            ConverterConfig::Integer => Converter::Integer(IntegerConverter),
            ConverterConfig::Decimal => Converter::Decimal(DecimalConverter),
            ConverterConfig::Text => Converter::Text(TextConverter),
            ConverterConfig::Boolean {
                true_values,
                false_value,
            } => Converter::Boolean(BooleanConverter::new(
                true_values.clone().unwrap_or_else(|| defaults.true_values.clone()),
                false_value.as_deref().unwrap_or(&defaults.false_value),
            )),
            ConverterConfig::Date { format } => Converter::Date(DateConverter::new(
                format.as_deref().unwrap_or(&defaults.date_format),
            )),
            ConverterConfig::DateTime { format } => Converter::DateTime(DateTimeConverter::new(
                format.as_deref().unwrap_or(&defaults.datetime_format),
            )),
            ConverterConfig::Reference {
                entity,
                label_attribute,
            } => Converter::Reference(
                ReferenceConverter::new(
                    entity.clone(),
                    Arc::clone(&context.store),
                    Arc::clone(&context.cache),
                )
                .with_label_attribute(
                    label_attribute
                        .as_deref()
                        .unwrap_or(&defaults.label_attribute),
                ),
            ),
            ConverterConfig::ReferenceSet { entity } => Converter::ReferenceSet(
                ReferenceSetConverter::new(entity.clone(), Arc::clone(&context.store)),
            ),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Converter::Integer(_) => "integer",
            Converter::Decimal(_) => "decimal",
            Converter::Text(_) => "text",
            Converter::Boolean(_) => "boolean",
            Converter::Date(_) => "date",
            Converter::DateTime(_) => "datetime",
            Converter::Reference(_) => "reference",
            Converter::ReferenceSet(_) => "reference set",
        }
    }

    /// External text to an internal value. `None` and `""` mean absent.
    pub fn clean(&self, external: Option<&str>) -> RowbridgeResult<InternalValue> {
        match self {
            Converter::Integer(c) => c.clean(external),
            Converter::Decimal(c) => c.clean(external),
            Converter::Text(c) => c.clean(external),
            Converter::Boolean(c) => c.clean(external),
            Converter::Date(c) => c.clean(external),
            Converter::DateTime(c) => c.clean(external),
            Converter::Reference(c) => c.clean(external),
            Converter::ReferenceSet(c) => c.clean(external),
        }
    }

    /// Like [`Self::clean`], but reports an unresolved single reference
    /// alongside the `Null` it produced.
    pub fn clean_checked(&self, external: Option<&str>) -> RowbridgeResult<CleanOutcome> {
        match self {
            Converter::Reference(c) => {
                let resolution = c.resolve(external)?;
                let unresolved = resolution.unresolved().cloned();
                Ok(CleanOutcome {
                    value: resolution.into_value(),
                    unresolved,
                })
            }
            other => other.clean(external).map(CleanOutcome::from),
        }
    }

    /// Internal value to external text.
    pub fn render(&self, value: &InternalValue) -> RowbridgeResult<String> {
        match self {
            Converter::Integer(c) => c.render(value),
            Converter::Decimal(c) => c.render(value),
            Converter::Text(c) => c.render(value),
            Converter::Boolean(c) => c.render(value),
            Converter::Date(c) => c.render(value),
            Converter::DateTime(c) => c.render(value),
            Converter::Reference(c) => c.render(value),
            Converter::ReferenceSet(c) => c.render(value),
        }
    }
}
