//! Configuration types

use crate::*;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Default chrono pattern for dates (`YYYY-MM-DD`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Default chrono pattern for datetimes (`YYYY-MM-DD HH:MM:SS`).
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_TRUE_VALUE: &str = "1";
pub const DEFAULT_FALSE_VALUE: &str = "0";
/// Attribute consulted when a reference identifier is not a valid key.
pub const DEFAULT_LABEL_ATTRIBUTE: &str = "title";

/// Per-field converter selection and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConverterConfig {
    Integer,
    Decimal,
    Text,
    Boolean {
        #[serde(default)]
        true_values: Option<Vec<String>>,
        #[serde(default)]
        false_value: Option<String>,
    },
    Date {
        #[serde(default)]
        format: Option<String>,
    },
    DateTime {
        #[serde(default)]
        format: Option<String>,
    },
    Reference {
        entity: EntityKind,
        #[serde(default)]
        label_attribute: Option<String>,
    },
    ReferenceSet {
        entity: EntityKind,
    },
}

impl ConverterConfig {
    /// Validate the options of this converter, with `defaults` filling gaps.
    pub fn validate(&self, field: &str, defaults: &ConversionDefaults) -> RowbridgeResult<()> {
        match self {
            ConverterConfig::Integer | ConverterConfig::Decimal | ConverterConfig::Text => Ok(()),
            ConverterConfig::ReferenceSet { .. } => Ok(()),
            ConverterConfig::Boolean {
                true_values,
                false_value,
            } => {
                let true_values = true_values.as_ref().unwrap_or(&defaults.true_values);
                let false_value = false_value.as_ref().unwrap_or(&defaults.false_value);
                validate_boolean_tokens(&format!("{field}.true_values"), true_values, false_value)
            }
            ConverterConfig::Date { format } => {
                let format = format.as_deref().unwrap_or(&defaults.date_format);
                validate_date_format(&format!("{field}.format"), format)
            }
            ConverterConfig::DateTime { format } => {
                let format = format.as_deref().unwrap_or(&defaults.datetime_format);
                validate_datetime_format(&format!("{field}.format"), format)
            }
            ConverterConfig::Reference {
                label_attribute, ..
            } => match label_attribute {
                Some(attr) if attr.trim().is_empty() => Err(invalid(
                    &format!("{field}.label_attribute"),
                    attr,
                    "label_attribute must not be empty",
                )),
                _ => Ok(()),
            },
        }
    }
}

/// One column of a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    pub converter: ConverterConfig,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, converter: ConverterConfig) -> Self {
        Self {
            name: name.into(),
            converter,
        }
    }
}

/// Session-wide defaults applied where a field leaves an option unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionDefaults {
    pub date_format: String,
    pub datetime_format: String,
    pub true_values: Vec<String>,
    pub false_value: String,
    pub label_attribute: String,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            true_values: vec![DEFAULT_TRUE_VALUE.to_string()],
            false_value: DEFAULT_FALSE_VALUE.to_string(),
            label_attribute: DEFAULT_LABEL_ATTRIBUTE.to_string(),
        }
    }
}

impl ConversionDefaults {
    /// Create from environment variables with fallback to defaults.
    ///
    /// This is the entry point for applications; nothing inside the
    /// workspace reads the process environment. Tests go through
    /// [`Self::from_lookup`].
    ///
    /// Environment variables:
    /// - `ROWBRIDGE_DATE_FORMAT`: chrono pattern for dates (default: `%Y-%m-%d`)
    /// - `ROWBRIDGE_DATETIME_FORMAT`: chrono pattern for datetimes (default: `%Y-%m-%d %H:%M:%S`)
    /// - `ROWBRIDGE_TRUE_VALUES`: comma-separated true tokens (default: `1`)
    /// - `ROWBRIDGE_FALSE_VALUE`: false token (default: `0`)
    /// - `ROWBRIDGE_LABEL_ATTRIBUTE`: reference fallback attribute (default: `title`)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            date_format: non_empty("ROWBRIDGE_DATE_FORMAT").unwrap_or(defaults.date_format),
            datetime_format: non_empty("ROWBRIDGE_DATETIME_FORMAT")
                .unwrap_or(defaults.datetime_format),
            true_values: non_empty("ROWBRIDGE_TRUE_VALUES")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or(defaults.true_values),
            false_value: non_empty("ROWBRIDGE_FALSE_VALUE").unwrap_or(defaults.false_value),
            label_attribute: non_empty("ROWBRIDGE_LABEL_ATTRIBUTE")
                .unwrap_or(defaults.label_attribute),
        }
    }

    /// Validate the defaults.
    ///
    /// Validates:
    /// - both format patterns are supported by chrono and round-trip a sample value
    /// - at least one true token, none equal to the false token
    /// - label_attribute is not blank
    pub fn validate(&self) -> RowbridgeResult<()> {
        validate_date_format("defaults.date_format", &self.date_format)?;
        validate_datetime_format("defaults.datetime_format", &self.datetime_format)?;
        validate_boolean_tokens("defaults.true_values", &self.true_values, &self.false_value)?;

        if self.label_attribute.trim().is_empty() {
            return Err(invalid(
                "defaults.label_attribute",
                &self.label_attribute,
                "label_attribute must not be empty",
            ));
        }

        Ok(())
    }
}

/// Field-to-converter mapping for one import/export session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub defaults: ConversionDefaults,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl MappingConfig {
    /// Parse and validate a TOML mapping document.
    pub fn from_toml_str(source: &str) -> RowbridgeResult<Self> {
        let config: MappingConfig = toml::from_str(source)
            .map_err(|e| invalid("mapping", "<toml>", &e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON mapping document.
    pub fn from_json_str(source: &str) -> RowbridgeResult<Self> {
        let config: MappingConfig = serde_json::from_str(source)
            .map_err(|e| invalid("mapping", "<json>", &e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate defaults, every field, and field-name uniqueness.
    pub fn validate(&self) -> RowbridgeResult<()> {
        self.defaults.validate()?;

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(RowbridgeError::Config(ConfigError::MissingRequired {
                    field: "fields[].name".to_string(),
                }));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(RowbridgeError::Config(ConfigError::DuplicateField {
                    name: field.name.clone(),
                }));
            }
            field.converter.validate(&field.name, &self.defaults)?;
        }

        Ok(())
    }
}

// ============================================================================
// VALIDATION HELPERS
// ============================================================================

fn invalid(field: &str, value: &str, reason: &str) -> RowbridgeError {
    RowbridgeError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

fn validate_date_format(field: &str, format: &str) -> RowbridgeResult<()> {
    let sample = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap_or_default();
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return Err(invalid(field, format, "pattern cannot format a date"));
    }
    match NaiveDate::parse_from_str(&rendered, format) {
        Ok(parsed) if parsed == sample => Ok(()),
        _ => Err(invalid(field, format, "pattern does not round-trip a date")),
    }
}

fn validate_datetime_format(field: &str, format: &str) -> RowbridgeResult<()> {
    let sample = NaiveDate::from_ymd_opt(2001, 2, 3)
        .and_then(|d| d.and_hms_opt(4, 5, 6))
        .unwrap_or_default();
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return Err(invalid(field, format, "pattern cannot format a datetime"));
    }
    match NaiveDateTime::parse_from_str(&rendered, format) {
        Ok(parsed) if parsed == sample => Ok(()),
        _ => Err(invalid(field, format, "pattern does not round-trip a datetime")),
    }
}

fn validate_boolean_tokens(
    field: &str,
    true_values: &[String],
    false_value: &str,
) -> RowbridgeResult<()> {
    if true_values.is_empty() {
        return Err(invalid(field, "[]", "at least one true token is required"));
    }
    if true_values.iter().any(|t| t == false_value) {
        return Err(invalid(
            field,
            false_value,
            "false token must differ from every true token",
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
